//! Collection declarations for the `astrostar` store.
//!
//! Declaration order matters: atomic lookups first, then dependent
//! collections, then bridges. Provisioning and listings follow this order.

use crate::model::{MaterialOrigin, ScheduleStatus};
use crate::schema::{Collection, CollectionSchema};

// Atomic lookups.

define_collection! {
    Permission => "permissions" (Atomic) {
        permission: String,
    }
}

define_collection! {
    Role => "roles" (Atomic) {
        name: String,
        description: String,
        status: Bool,
    }
}

define_collection! {
    /// Application module a role permission applies to.
    Module => "modules" (Atomic) {
        module_name: String,
    }
}

define_collection! {
    DocumentType => "document_types" (Atomic) {
        name: String,
    }
}

define_collection! {
    /// Stock item of sports equipment.
    SportsMaterial => "sports_material" (Atomic) {
        name: String,
        quantity: Int,
        description: String,
        status: Bool,
        /// Origin of the stock, `Comprado` or `Donado`.
        kind as "type": String,
    }
}

impl SportsMaterial {
    /// Typed origin; `None` when unset or outside the known vocabulary.
    pub fn origin(&self) -> Option<MaterialOrigin> {
        self.kind.as_deref().and_then(MaterialOrigin::parse)
    }
}

define_collection! {
    /// Age band used to group sportsmen and teams.
    SportsCategory => "sports_categories" (Atomic) {
        name: String,
        min_age: Int,
        max_age: Int,
        details: String,
        url: String,
        status: Bool,
    }
}

define_collection! {
    EmployeeType => "employee_types" (Atomic) {
        name: String,
        description: String,
        status: Bool,
    }
}

define_collection! {
    Program => "programs" (Atomic) {
        program_name: String,
        description: String,
        status: Bool,
        url_image: String,
    }
}

define_collection! {
    ServiceType => "service_types" (Atomic) {
        service_type_name: String,
    }
}

// Dependent collections.

define_collection! {
    Person => "persons" (Dependent) {
        first_name: String,
        last_name: String,
        identification: String,
        phone_number: String,
        email: String,
        is_sportsman: Bool,
        id_document_type: Ref("document_types"),
        /// Legal guardian, itself a person.
        id_guardian: Ref("persons"),
    }
}

define_collection! {
    /// Login account. `password` holds whatever the application stores.
    User => "users" (Dependent) {
        first_name: String,
        identification: String,
        email: String,
        phone_number: String,
        password: String,
        status: Bool,
        id_role: Ref("roles"),
        id_document_type: Ref("document_types"),
    }
}

define_collection! {
    Supplier => "suppliers" (Dependent) {
        company_name: String,
        tax_id: String,
        first_name: String,
        identification_number: String,
        contact_name: String,
        contact_phone: String,
        contact_email: String,
        address: String,
        description: String,
        status: Bool,
        entity_type: String,
        id_document_type: Ref("document_types"),
    }
}

define_collection! {
    Purchase => "purchases" (Dependent) {
        invoice_number: String,
        purchase_date: Date,
        total: Double,
        id_supplier: Ref("suppliers"),
        status: Bool,
    }
}

define_collection! {
    PurchaseDetail => "purchase_details" (Dependent) {
        quantity: Int,
        unit_price: Double,
        subtotal: Double,
        id_purchase: Ref("purchases"),
        id_sports_material: Ref("sports_material"),
    }
}

define_collection! {
    Employee => "employees" (Dependent) {
        id_user: Ref("users"),
        id_employee_type: Ref("employee_types"),
        age: Int,
        status: Bool,
        status_date: Date,
    }
}

define_collection! {
    EmployeeSchedule => "employee_schedules" (Dependent) {
        id_employee: Ref("employees"),
        schedule_date: Date,
        start_time: String,
        end_time: String,
        description: String,
        status: String,
        cancellation_reason: String,
    }
}

impl EmployeeSchedule {
    pub fn schedule_status(&self) -> Option<ScheduleStatus> {
        self.status.as_deref().and_then(ScheduleStatus::parse)
    }
}

define_collection! {
    DonorSponsor => "donor_sponsors" (Dependent) {
        social_reason: String,
        tax_id: String,
        contact_person: String,
        phone: String,
        email: String,
        kind as "type": String,
        status: Bool,
        id_document_type: Ref("document_types"),
    }
}

define_collection! {
    Donation => "donations" (Dependent) {
        id_donor_sponsor: Ref("donor_sponsors"),
        quantity: Int,
        description: String,
        status: Bool,
        donation_type: String,
        donation_date: Date,
        registration_date: Date,
    }
}

define_collection! {
    DonationDetail => "donation_details" (Dependent) {
        id_donation: Ref("donations"),
        id_sports_material: Ref("sports_material"),
        description: String,
        quantity: Int,
        status: Bool,
        observation: String,
    }
}

define_collection! {
    Sportsman => "sportsmen" (Dependent) {
        id_person: Ref("persons"),
        id_sports_category: Ref("sports_categories"),
        age: Int,
    }
}

define_collection! {
    Appointment => "appointments" (Dependent) {
        appointment_datetime: Date,
        title: String,
        description: String,
        status: String,
        concept: String,
        id_sportsman: Ref("sportsmen"),
        id_employee: Ref("employees"),
        id_program: Ref("programs"),
    }
}

impl Appointment {
    pub fn schedule_status(&self) -> Option<ScheduleStatus> {
        self.status.as_deref().and_then(ScheduleStatus::parse)
    }
}

define_collection! {
    Service => "services" (Dependent) {
        id_service_type: Ref("service_types"),
        service_name: String,
        service_description: String,
        start_date: Date,
        end_date: Date,
        location: String,
        contact_phone: String,
        url_image: String,
        service_status: String,
        service_details: String,
    }
}

define_collection! {
    /// Walk-in participant registered without a full person record.
    TempPerson => "temp_persons" (Dependent) {
        person_type: String,
        name: String,
        id_document_type: Ref("document_types"),
        identification: String,
        age: Int,
        phone_number: String,
        birth_date: Date,
        id_sports_category: Ref("sports_categories"),
    }
}

define_collection! {
    Team => "teams" (Dependent) {
        team_name: String,
        id_sports_category: Ref("sports_categories"),
    }
}

// Bridges.

define_collection! {
    RolePermission => "role_permissions" (Bridge) {
        id_role: Ref("roles"),
        id_permission: Ref("permissions"),
        id_module: Ref("modules"),
    }
}

define_collection! {
    /// Registers either a person or a temporary person for a service.
    ServiceRegistration => "service_registrations" (Bridge) {
        id_person: Ref("persons"),
        id_temp_person: Ref("temp_persons"),
        id_service: Ref("services"),
        registration_date: Date,
        registration_status: String,
    }
    exclusive ["id_person", "id_temp_person"]
}

define_collection! {
    SponsorService => "sponsors_services" (Bridge) {
        id_service: Ref("services"),
        id_donor_sponsor: Ref("donor_sponsors"),
        sponsorship_description: String,
    }
}

define_collection! {
    TeamMember => "team_members" (Bridge) {
        id_team: Ref("teams"),
        id_person: Ref("persons"),
        id_temp_person: Ref("temp_persons"),
        role_in_team: String,
    }
    exclusive ["id_person", "id_temp_person"]
}

define_collection! {
    TeamRegistration => "team_registrations" (Bridge) {
        id_team: Ref("teams"),
        id_service: Ref("services"),
        registration_date: Date,
        registration_status: String,
    }
}

static CATALOG: &[CollectionSchema] = &[
    Permission::SCHEMA,
    Role::SCHEMA,
    Module::SCHEMA,
    DocumentType::SCHEMA,
    SportsMaterial::SCHEMA,
    SportsCategory::SCHEMA,
    EmployeeType::SCHEMA,
    Program::SCHEMA,
    ServiceType::SCHEMA,
    Person::SCHEMA,
    User::SCHEMA,
    Supplier::SCHEMA,
    Purchase::SCHEMA,
    PurchaseDetail::SCHEMA,
    Employee::SCHEMA,
    EmployeeSchedule::SCHEMA,
    DonorSponsor::SCHEMA,
    Donation::SCHEMA,
    DonationDetail::SCHEMA,
    Sportsman::SCHEMA,
    Appointment::SCHEMA,
    Service::SCHEMA,
    TempPerson::SCHEMA,
    Team::SCHEMA,
    RolePermission::SCHEMA,
    ServiceRegistration::SCHEMA,
    SponsorService::SCHEMA,
    TeamMember::SCHEMA,
    TeamRegistration::SCHEMA,
];

/// Returns every declared collection in declaration order.
pub fn catalog() -> &'static [CollectionSchema] {
    CATALOG
}

pub fn find_collection(name: &str) -> Option<&'static CollectionSchema> {
    CATALOG.iter().find(|schema| schema.name == name)
}
