use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::models::{
    Appointment, Attendance, AuditEntry, Campaign, CampaignForm, Client, CreatedInvoice,
    IncomeReport, Invoice, InvoiceDetail, InvoiceForm, NewAppointment, NewAttendance, NewClient,
    NewService, NewStaff, NewUser, Service, ServiceSales, Staff, User,
};

/// Everything the HTTP layer needs from persistence.
///
/// Implemented by [`crate::db::SqliteRepository`] and
/// [`crate::local::MockRepository`]; the server picks one from
/// [`crate::config::StorageKind`] at start-up.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_clients(&self) -> Result<Vec<Client>>;
    /// Fails with `EmailTaken` when another client already uses the email.
    async fn create_client(&self, client: &NewClient) -> Result<i64>;
    async fn update_client(&self, id: i64, client: &NewClient) -> Result<()>;
    async fn delete_client(&self, id: i64) -> Result<()>;

    async fn list_services(&self) -> Result<Vec<Service>>;
    async fn create_service(&self, service: &NewService) -> Result<i64>;
    async fn update_service(&self, id: i64, service: &NewService) -> Result<()>;
    async fn delete_service(&self, id: i64) -> Result<()>;

    async fn list_staff(&self) -> Result<Vec<Staff>>;
    async fn create_staff(&self, staff: &NewStaff) -> Result<i64>;

    /// Oldest first.
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Fails with `EmailTaken` when another user already uses the email.
    async fn create_user(&self, user: &NewUser) -> Result<i64>;

    async fn list_appointments(&self) -> Result<Vec<Appointment>>;
    async fn create_appointment(&self, appointment: &NewAppointment) -> Result<i64>;
    async fn update_appointment_status(&self, id: i64, status: &str) -> Result<()>;

    async fn list_invoices(&self) -> Result<Vec<Invoice>>;
    async fn read_invoice(&self, id: i64) -> Result<InvoiceDetail>;
    /// Writes the header, one line per service and the payment as a unit.
    async fn create_invoice(
        &self,
        invoice: &InvoiceForm,
        issued_at: NaiveDateTime,
    ) -> Result<CreatedInvoice>;

    async fn list_attendance(&self, date: Option<NaiveDate>) -> Result<Vec<Attendance>>;
    async fn create_attendance(&self, attendance: &NewAttendance) -> Result<i64>;

    async fn income_report(&self, start: NaiveDate, end: NaiveDate) -> Result<IncomeReport>;
    async fn services_report(&self, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<ServiceSales>>;

    async fn list_campaigns(&self) -> Result<Vec<Campaign>>;
    async fn create_campaign(&self, campaign: &CampaignForm) -> Result<i64>;

    /// Newest first. Backends without an audit trail return nothing.
    async fn audit_log(&self) -> Result<Vec<AuditEntry>> {
        Ok(Vec::new())
    }
}
