use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub static DATE_FORMAT: &str = "%Y-%m-%d";
pub static DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const STATUS_SCHEDULED: &str = "Scheduled";
pub const STATUS_PAID: &str = "Paid";

// Clients

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Free-form notes column, shown as the address in the UI.
    pub address: Option<String>,
    /// Number of invoice lines billed to this client.
    pub services: i64,
}

/// Client payload as submitted by the register/edit forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientForm {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl ClientForm {
    pub fn normalize(&self) -> NewClient {
        let (first_name, last_name) = split_name(&self.name);
        NewClient {
            first_name,
            last_name,
            email: non_blank(&self.email),
            phone: non_blank(&self.phone),
            notes: non_blank(&self.address),
        }
    }
}

impl NewClient {
    pub fn display_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

// Services

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Minutes.
    pub duration: i64,
    pub price: f64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewService {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration: i64,
    pub price: f64,
}

// Staff

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Staff {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffForm {
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStaff {
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

impl StaffForm {
    pub fn normalize(&self) -> NewStaff {
        let (first_name, last_name) = split_name(&self.name);
        NewStaff {
            first_name,
            last_name,
            role: self.role.trim().to_string(),
        }
    }
}

// Admin users

pub const USER_ACTIVE: &str = "activo";
pub const USER_INACTIVE: &str = "inactivo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub permissions: Vec<String>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == USER_ACTIVE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub permissions: Vec<String>,
}

impl UserForm {
    /// New users start active and without permissions.
    pub fn normalize(&self) -> Result<NewUser> {
        let field = |value: &str, name: &str| -> Result<String> {
            let value = value.trim();
            if value.is_empty() {
                return Err(Error::InvalidInput(format!("{} is required", name)));
            }
            Ok(value.to_string())
        };

        Ok(NewUser {
            name: field(&self.name, "name")?,
            email: field(&self.email, "email")?,
            role: field(&self.role, "role")?,
            status: USER_ACTIVE.to_string(),
            permissions: Vec::new(),
        })
    }
}

// Appointments

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub client_name: String,
    pub staff_name: Option<String>,
    pub scheduled_start: String,
    pub scheduled_end: String,
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentForm {
    pub client_id: i64,
    #[serde(default)]
    pub staff_id: Option<i64>,
    pub date: String,
    pub time: String,
    /// Minutes.
    pub duration: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub client_id: i64,
    pub staff_id: Option<i64>,
    pub scheduled_start: String,
    pub scheduled_end: String,
    pub status: String,
    pub notes: Option<String>,
}

impl AppointmentForm {
    /// Combines date and time into the start and adds `duration` minutes for the end.
    pub fn schedule(&self) -> Result<NewAppointment> {
        let start = NaiveDateTime::new(parse_date(&self.date)?, parse_time(&self.time)?);
        let end = Duration::try_minutes(self.duration)
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(|| Error::InvalidInput(format!("duration {} is out of range", self.duration)))?;

        Ok(NewAppointment {
            client_id: self.client_id,
            staff_id: self.staff_id,
            scheduled_start: start.format(DATETIME_FORMAT).to_string(),
            scheduled_end: end.format(DATETIME_FORMAT).to_string(),
            status: STATUS_SCHEDULED.to_string(),
            notes: non_blank(&self.notes),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

// Invoices

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Sinpe,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Sinpe => "sinpe",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "sinpe" => Ok(PaymentMethod::Sinpe),
            "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(Error::InvalidInput(format!("unknown payment method '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub issued_at: String,
    pub client_name: String,
    pub total: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub id: i64,
    pub service_id: Option<i64>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub amount: f64,
    pub method: String,
    pub paid_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineForm {
    pub service_id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceForm {
    pub client_id: i64,
    #[serde(default)]
    pub appointment_id: Option<i64>,
    pub services: Vec<InvoiceLineForm>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub tip: Option<f64>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoiceLine {
    pub service_id: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub line_total: f64,
}

impl InvoiceForm {
    pub fn lines(&self) -> Vec<NewInvoiceLine> {
        self.services
            .iter()
            .map(|s| {
                let quantity = s.quantity.unwrap_or(1);
                NewInvoiceLine {
                    service_id: s.service_id,
                    description: s.name.clone(),
                    quantity,
                    unit_price: s.price,
                    line_total: s.price * quantity as f64,
                }
            })
            .collect()
    }

    pub fn subtotal(&self) -> f64 {
        self.lines().iter().map(|l| l.line_total).sum()
    }

    /// Subtotal plus tax and tip; missing amounts count as zero.
    pub fn total(&self) -> f64 {
        self.subtotal() + self.tax.unwrap_or(0.0) + self.tip.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedInvoice {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub total: f64,
}

pub fn format_invoice_number(seq: i64) -> String {
    format!("INV-{:06}", seq)
}

// Attendance

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: i64,
    pub employee_name: String,
    pub date: String,
    pub check_in: String,
    pub check_out: Option<String>,
    pub break_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceForm {
    pub staff_id: i64,
    pub date: String,
    pub check_in: String,
    #[serde(default)]
    pub check_out: Option<String>,
    #[serde(default)]
    pub break_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttendance {
    pub staff_id: i64,
    pub date_worked: String,
    pub check_in: String,
    pub check_out: Option<String>,
    pub break_minutes: i64,
}

impl AttendanceForm {
    /// Check-in and check-out are times on `date`.
    pub fn normalize(&self) -> Result<NewAttendance> {
        let date = parse_date(&self.date)?;
        let at = |time: &str| -> Result<String> {
            Ok(NaiveDateTime::new(date, parse_time(time)?)
                .format(DATETIME_FORMAT)
                .to_string())
        };

        let check_out = match non_blank(&self.check_out) {
            Some(time) => Some(at(&time)?),
            None => None,
        };

        Ok(NewAttendance {
            staff_id: self.staff_id,
            date_worked: date.format(DATE_FORMAT).to_string(),
            check_in: at(&self.check_in)?,
            check_out,
            break_minutes: self.break_minutes.unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<String>,
}

impl AttendanceQuery {
    pub fn date(&self) -> Result<Option<NaiveDate>> {
        match non_blank(&self.date) {
            Some(d) => Ok(Some(parse_date(&d)?)),
            None => Ok(None),
        }
    }
}

// Marketing

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub channel: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignForm {
    pub name: String,
    pub channel: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: f64,
}

impl CampaignForm {
    /// Same fields with the dates checked and written back in canonical form.
    pub fn normalize(&self) -> Result<CampaignForm> {
        Ok(CampaignForm {
            name: self.name.trim().to_string(),
            channel: self.channel.trim().to_string(),
            start_date: parse_date(&self.start_date)?.format(DATE_FORMAT).to_string(),
            end_date: parse_date(&self.end_date)?.format(DATE_FORMAT).to_string(),
            budget: self.budget,
        })
    }
}

// Reports

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    pub fn parse(&self) -> Result<(NaiveDate, NaiveDate)> {
        Ok((parse_date(&self.start_date)?, parse_date(&self.end_date)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IncomeReport {
    pub total_facturas: i64,
    pub total_ingresos: f64,
    pub promedio_factura: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSales {
    pub servicio: String,
    pub cantidad: i64,
    pub total_ventas: f64,
}

// Audit log

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub timestamp: String,
}

// Helpers

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| Error::InvalidInput(format!("invalid date '{}'", raw)))
}

/// Accepts `HH:MM` as sent by time inputs, or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| Error::InvalidInput(format!("invalid time '{}'", raw)))
}

/// First word is the first name, the rest is the last name.
pub fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}

pub fn join_name(first: &str, last: &str) -> String {
    format!("{} {}", first, last).trim().to_string()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(service_id: i64, price: f64, quantity: Option<i64>) -> InvoiceLineForm {
        InvoiceLineForm {
            service_id,
            name: format!("service {}", service_id),
            price,
            quantity,
        }
    }

    #[test]
    fn test_client_form_normalize() {
        let form = ClientForm {
            name: "  Juan Carlos Mora ".to_string(),
            email: Some("  ".to_string()),
            phone: Some(" 8888-1234 ".to_string()),
            address: None,
        };

        let client = form.normalize();
        assert_eq!(client.first_name, "Juan");
        assert_eq!(client.last_name, "Carlos Mora");
        assert_eq!(client.email, None);
        assert_eq!(client.phone.as_deref(), Some("8888-1234"));
        assert_eq!(client.display_name(), "Juan Carlos Mora");
    }

    #[test]
    fn test_single_word_name_has_empty_last_name() {
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
        assert_eq!(join_name("Cher", ""), "Cher");
    }

    #[test]
    fn test_appointment_schedule_adds_duration() -> Result<()> {
        let form = AppointmentForm {
            client_id: 1,
            staff_id: None,
            date: "2024-03-10".to_string(),
            time: "23:30".to_string(),
            duration: 45,
            notes: Some(String::new()),
        };

        let appt = form.schedule()?;
        assert_eq!(appt.scheduled_start, "2024-03-10 23:30:00");
        assert_eq!(appt.scheduled_end, "2024-03-11 00:15:00");
        assert_eq!(appt.status, STATUS_SCHEDULED);
        assert_eq!(appt.notes, None);

        Ok(())
    }

    #[test]
    fn test_bad_time_is_invalid_input() {
        let form = AppointmentForm {
            client_id: 1,
            staff_id: None,
            date: "2024-03-10".to_string(),
            time: "half past nine".to_string(),
            duration: 30,
            notes: None,
        };

        assert!(matches!(form.schedule(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_huge_duration_is_invalid_input() {
        let mut form = AppointmentForm {
            client_id: 1,
            staff_id: None,
            date: "2024-03-10".to_string(),
            time: "09:30".to_string(),
            duration: 9_000_000_000_000,
            notes: None,
        };
        assert!(matches!(form.schedule(), Err(Error::InvalidInput(_))));

        form.duration = i64::MAX;
        assert!(matches!(form.schedule(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_user_form_starts_active() {
        let form = UserForm {
            name: "  Marta Rojas ".to_string(),
            email: "marta@barberia.com".to_string(),
            role: "Recepción".to_string(),
        };

        let user = form.normalize().unwrap();
        assert_eq!(user.name, "Marta Rojas");
        assert_eq!(user.status, USER_ACTIVE);
        assert!(user.permissions.is_empty());

        let blank = UserForm {
            role: " ".to_string(),
            ..form
        };
        assert!(matches!(blank.normalize(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_payment_method_from_str() {
        assert_eq!("sinpe".parse::<PaymentMethod>().unwrap(), PaymentMethod::Sinpe);
        assert_eq!(" Card ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        for method in [PaymentMethod::Cash, PaymentMethod::Transfer] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        assert!(matches!(
            "cheque".parse::<PaymentMethod>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invoice_total_without_tax_or_tip() {
        let form = InvoiceForm {
            client_id: 7,
            appointment_id: None,
            services: vec![line(1, 8000.0, None), line(2, 6500.0, None)],
            tax: None,
            tip: None,
            payment_method: PaymentMethod::Sinpe,
        };

        assert_eq!(form.lines().len(), 2);
        assert_eq!(form.total(), 14500.0);
    }

    #[test]
    fn test_invoice_total_with_quantity_tax_and_tip() {
        let form = InvoiceForm {
            client_id: 7,
            appointment_id: Some(3),
            services: vec![line(1, 5000.0, Some(2))],
            tax: Some(1300.0),
            tip: Some(500.0),
            payment_method: PaymentMethod::Cash,
        };

        assert_eq!(form.lines()[0].line_total, 10000.0);
        assert_eq!(form.subtotal(), 10000.0);
        assert_eq!(form.total(), 11800.0);
    }

    #[test]
    fn test_invoice_form_wire_format() -> std::result::Result<(), serde_json::Error> {
        let form: InvoiceForm = serde_json::from_str(
            r#"{"clientId":7,"services":[{"serviceId":1,"name":"Corte","price":8000}],"paymentMethod":"sinpe"}"#,
        )?;

        assert_eq!(form.payment_method, PaymentMethod::Sinpe);
        assert_eq!(form.appointment_id, None);
        assert_eq!(form.services[0].quantity, None);

        Ok(())
    }

    #[test]
    fn test_attendance_normalize() -> Result<()> {
        let form = AttendanceForm {
            staff_id: 2,
            date: "2024-05-02".to_string(),
            check_in: "08:00".to_string(),
            check_out: Some("17:15".to_string()),
            break_minutes: None,
        };

        let attendance = form.normalize()?;
        assert_eq!(attendance.date_worked, "2024-05-02");
        assert_eq!(attendance.check_in, "2024-05-02 08:00:00");
        assert_eq!(attendance.check_out.as_deref(), Some("2024-05-02 17:15:00"));
        assert_eq!(attendance.break_minutes, 0);

        Ok(())
    }

    #[test]
    fn test_invoice_number_is_zero_padded() {
        assert_eq!(format_invoice_number(1), "INV-000001");
        assert_eq!(format_invoice_number(1234567), "INV-1234567");
    }
}
