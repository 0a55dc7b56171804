//! Local mock persistence.
//!
//! A key-per-table map of generic records, serialized as JSON text and kept
//! either in memory or in a single file. Every mutating repository call also
//! appends to the audit log (bitácora). This backend never talks to the SQL
//! database; the two are alternative demo modes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use rand::{thread_rng, Rng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::db::{EMAIL_TAKEN, EMAIL_TAKEN_OTHER, USER_EMAIL_TAKEN};
use crate::error::{Error, Result};
use crate::models::{
    format_invoice_number, join_name, parse_date, Appointment, Attendance, AuditEntry, Campaign,
    CampaignForm, Client, CreatedInvoice, IncomeReport, Invoice, InvoiceDetail, InvoiceForm,
    InvoiceLine, NewAppointment, NewAttendance, NewClient, NewInvoiceLine, NewService, NewStaff,
    NewUser, Payment, Service, ServiceSales, Staff, User, DATETIME_FORMAT, STATUS_PAID,
};
use crate::repository::Repository;

const CLIENTS: &str = "clients";
const SERVICES: &str = "services";
const STAFF: &str = "staff";
const APPOINTMENTS: &str = "appointments";
const INVOICES: &str = "invoices";
const INVOICE_LINES: &str = "invoice_lines";
const PAYMENTS: &str = "payments";
const ATTENDANCE: &str = "attendance";
const CAMPAIGNS: &str = "campaigns";
const USERS: &str = "users";

const INVOICE_SEQUENCE: &str = "invoice_number";

/// A stored row: generated id, timestamps and the entity itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub data: Value,
}

impl Record {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Everything the mock store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub tables: BTreeMap<String, Vec<Record>>,
    pub bitacora: Vec<AuditEntry>,
    pub sequences: BTreeMap<String, i64>,
}

fn now() -> String {
    Local::now().format(DATETIME_FORMAT).to_string()
}

/// Unix millis followed by a three digit random suffix.
fn generate_id() -> i64 {
    Local::now().timestamp_millis() * 1000 + thread_rng().gen_range(0..1000)
}

/// A generated id, bumped past `last` so ids keep insertion order.
fn next_id(last: Option<i64>) -> i64 {
    let id = generate_id();
    match last {
        Some(last) if id <= last => last + 1,
        _ => id,
    }
}

impl Document {
    pub fn get_all(&self, table: &str) -> &[Record] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_by_id(&self, table: &str, id: i64) -> Option<&Record> {
        self.get_all(table).iter().find(|r| r.id == id)
    }

    pub fn add<T: Serialize>(&mut self, table: &str, value: &T) -> Result<i64> {
        let data = serde_json::to_value(value)?;
        let rows = self.tables.entry(table.to_string()).or_default();

        let id = next_id(rows.iter().map(|r| r.id).max());

        let ts = now();
        rows.push(Record {
            id,
            created_at: ts.clone(),
            updated_at: ts,
            data,
        });

        Ok(id)
    }

    /// Replaces the data of row `id`. Returns false when there is no such row.
    pub fn update<T: Serialize>(&mut self, table: &str, id: i64, value: &T) -> Result<bool> {
        let data = serde_json::to_value(value)?;
        let row = self
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id));

        match row {
            Some(row) => {
                row.data = data;
                row.updated_at = now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delete(&mut self, table: &str, id: i64) -> bool {
        match self.tables.get_mut(table) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|r| r.id != id);
                rows.len() != before
            }
            None => false,
        }
    }

    /// Decodes every row of `table` together with its id.
    pub fn rows<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<(i64, T)>> {
        self.get_all(table)
            .iter()
            .map(|r| -> Result<(i64, T)> { Ok((r.id, r.decode()?)) })
            .collect()
    }

    pub fn row<T: DeserializeOwned>(&self, table: &str, id: i64) -> Result<Option<T>> {
        self.find_by_id(table, id).map(Record::decode).transpose()
    }

    pub fn next_sequence(&mut self, name: &str) -> i64 {
        let value = self.sequences.entry(name.to_string()).or_insert(0);
        *value += 1;
        *value
    }

    pub fn log(&mut self, actor: &str, action: &str, detail: impl Into<String>) {
        let id = next_id(self.bitacora.iter().map(|e| e.id).max());
        self.bitacora.push(AuditEntry {
            id,
            actor: actor.to_string(),
            action: action.to_string(),
            detail: detail.into(),
            timestamp: now(),
        });
    }

    /// Newest first.
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.bitacora.iter().rev().cloned().collect()
    }
}

/// Mutex-guarded [`Document`], optionally mirrored to a JSON file.
pub struct LocalStore {
    path: Option<PathBuf>,
    doc: Mutex<Document>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        LocalStore {
            path: None,
            doc: Mutex::new(Document::default()),
        }
    }

    /// Loads `path` if it exists; the file is created on the first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), "Opened local store");

        Ok(LocalStore {
            path: Some(path),
            doc: Mutex::new(doc),
        })
    }

    pub async fn read<T>(&self, f: impl FnOnce(&Document) -> Result<T>) -> Result<T> {
        let doc = self.doc.lock().await;
        f(&doc)
    }

    /// Runs `f` on a copy of the document and keeps the copy only if `f`
    /// succeeds and the copy could be saved.
    pub async fn write<T>(&self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let mut doc = self.doc.lock().await;
        let mut draft = doc.clone();
        let out = f(&mut draft)?;

        if let Some(path) = &self.path {
            let text = serde_json::to_string_pretty(&draft)?;
            tokio::fs::write(path, text).await?;
            debug!(path = %path.display(), "Saved local store");
        }

        *doc = draft;
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServiceRow {
    #[serde(flatten)]
    service: NewService,
    active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StaffRow {
    #[serde(flatten)]
    staff: NewStaff,
    active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InvoiceRow {
    invoice_number: String,
    client_id: i64,
    appointment_id: Option<i64>,
    issued_at: String,
    total_amount: f64,
    status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InvoiceLineRow {
    invoice_id: i64,
    #[serde(flatten)]
    line: NewInvoiceLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PaymentRow {
    invoice_id: i64,
    amount: f64,
    method: String,
    paid_at: String,
}

impl InvoiceRow {
    fn issued_on(&self) -> Option<NaiveDate> {
        self.issued_at.get(..10).and_then(|d| parse_date(d).ok())
    }

    fn paid_within(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.status == STATUS_PAID
            && self
                .issued_on()
                .map_or(false, |day| day >= start && day <= end)
    }
}

fn client_name(doc: &Document, id: i64) -> Result<Option<String>> {
    Ok(doc
        .row::<NewClient>(CLIENTS, id)?
        .map(|c| c.display_name()))
}

fn staff_name(doc: &Document, id: i64) -> Result<Option<String>> {
    Ok(doc
        .row::<StaffRow>(STAFF, id)?
        .map(|s| join_name(&s.staff.first_name, &s.staff.last_name)))
}

fn require(found: bool, what: &str, id: i64) -> Result<()> {
    if !found {
        return Err(Error::NotFound(format!("{} {}", what, id)));
    }
    Ok(())
}

/// Emails compare case-insensitively.
fn email_in_use(doc: &Document, email: &str, exclude: Option<i64>) -> Result<bool> {
    let email = email.to_lowercase();
    Ok(doc.rows::<NewClient>(CLIENTS)?.iter().any(|(id, c)| {
        Some(*id) != exclude
            && c.email.as_deref().map_or(false, |e| e.to_lowercase() == email)
    }))
}

/// [`Repository`] over a [`LocalStore`].
pub struct MockRepository {
    store: LocalStore,
    actor: String,
}

impl MockRepository {
    pub fn new(store: LocalStore, actor: impl Into<String>) -> Self {
        MockRepository {
            store,
            actor: actor.into(),
        }
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn list_clients(&self) -> Result<Vec<Client>> {
        self.store
            .read(|doc| {
                let invoices = doc.rows::<InvoiceRow>(INVOICES)?;
                let lines = doc.rows::<InvoiceLineRow>(INVOICE_LINES)?;

                let mut clients = doc
                    .rows::<NewClient>(CLIENTS)?
                    .into_iter()
                    .map(|(id, c)| {
                        let services = lines
                            .iter()
                            .filter(|(_, l)| {
                                invoices
                                    .iter()
                                    .any(|(inv_id, inv)| *inv_id == l.invoice_id && inv.client_id == id)
                            })
                            .count() as i64;

                        Client {
                            id,
                            name: c.display_name(),
                            email: c.email,
                            phone: c.phone,
                            address: c.notes,
                            services,
                        }
                    })
                    .collect::<Vec<_>>();

                clients.sort_by(|a, b| b.id.cmp(&a.id));
                Ok(clients)
            })
            .await
    }

    async fn create_client(&self, client: &NewClient) -> Result<i64> {
        self.store
            .write(|doc| {
                if let Some(email) = &client.email {
                    if email_in_use(doc, email, None)? {
                        return Err(Error::EmailTaken(EMAIL_TAKEN.to_string()));
                    }
                }

                let id = doc.add(CLIENTS, client)?;
                doc.log(
                    &self.actor,
                    "Crear cliente",
                    format!("Cliente {} registrado", client.display_name()),
                );
                Ok(id)
            })
            .await
    }

    async fn update_client(&self, id: i64, client: &NewClient) -> Result<()> {
        self.store
            .write(|doc| {
                if let Some(email) = &client.email {
                    if email_in_use(doc, email, Some(id))? {
                        return Err(Error::EmailTaken(EMAIL_TAKEN_OTHER.to_string()));
                    }
                }

                require(doc.update(CLIENTS, id, client)?, "client", id)?;
                doc.log(
                    &self.actor,
                    "Actualizar cliente",
                    format!("Cliente {} actualizado", client.display_name()),
                );
                Ok(())
            })
            .await
    }

    async fn delete_client(&self, id: i64) -> Result<()> {
        self.store
            .write(|doc| {
                require(doc.delete(CLIENTS, id), "client", id)?;
                doc.log(&self.actor, "Eliminar cliente", format!("Cliente #{} eliminado", id));
                Ok(())
            })
            .await
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        self.store
            .read(|doc| {
                let mut services: Vec<Service> = doc
                    .rows::<ServiceRow>(SERVICES)?
                    .into_iter()
                    .filter(|(_, row)| row.active)
                    .map(|(id, row)| Service {
                        id,
                        name: row.service.name,
                        description: row.service.description,
                        duration: row.service.duration,
                        price: row.service.price,
                        active: row.active,
                    })
                    .collect();

                services.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(services)
            })
            .await
    }

    async fn create_service(&self, service: &NewService) -> Result<i64> {
        self.store
            .write(|doc| {
                let row = ServiceRow {
                    service: service.clone(),
                    active: true,
                };
                let id = doc.add(SERVICES, &row)?;
                doc.log(
                    &self.actor,
                    "Crear servicio",
                    format!("Servicio {} creado", service.name),
                );
                Ok(id)
            })
            .await
    }

    async fn update_service(&self, id: i64, service: &NewService) -> Result<()> {
        self.store
            .write(|doc| {
                let mut row = doc
                    .row::<ServiceRow>(SERVICES, id)?
                    .ok_or_else(|| Error::NotFound(format!("service {}", id)))?;
                row.service = service.clone();
                doc.update(SERVICES, id, &row)?;
                doc.log(
                    &self.actor,
                    "Actualizar servicio",
                    format!("Servicio {} actualizado", service.name),
                );
                Ok(())
            })
            .await
    }

    async fn delete_service(&self, id: i64) -> Result<()> {
        self.store
            .write(|doc| {
                require(doc.delete(SERVICES, id), "service", id)?;
                doc.log(&self.actor, "Eliminar servicio", format!("Servicio #{} eliminado", id));
                Ok(())
            })
            .await
    }

    async fn list_staff(&self) -> Result<Vec<Staff>> {
        self.store
            .read(|doc| {
                let mut rows: Vec<(i64, StaffRow)> = doc
                    .rows::<StaffRow>(STAFF)?
                    .into_iter()
                    .filter(|(_, row)| row.active)
                    .collect();
                rows.sort_by(|a, b| a.1.staff.first_name.cmp(&b.1.staff.first_name));

                Ok(rows
                    .into_iter()
                    .map(|(id, row)| Staff {
                        id,
                        name: join_name(&row.staff.first_name, &row.staff.last_name),
                        role: row.staff.role,
                        active: row.active,
                    })
                    .collect())
            })
            .await
    }

    async fn create_staff(&self, staff: &NewStaff) -> Result<i64> {
        self.store
            .write(|doc| {
                let row = StaffRow {
                    staff: staff.clone(),
                    active: true,
                };
                let id = doc.add(STAFF, &row)?;
                doc.log(
                    &self.actor,
                    "Crear personal",
                    format!(
                        "{} agregado como {}",
                        join_name(&staff.first_name, &staff.last_name),
                        staff.role
                    ),
                );
                Ok(id)
            })
            .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.store
            .read(|doc| {
                let mut users: Vec<User> = doc
                    .rows::<NewUser>(USERS)?
                    .into_iter()
                    .map(|(id, u)| User {
                        id,
                        name: u.name,
                        email: u.email,
                        role: u.role,
                        status: u.status,
                        permissions: u.permissions,
                    })
                    .collect();

                users.sort_by_key(|u| u.id);
                Ok(users)
            })
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<i64> {
        self.store
            .write(|doc| {
                let email = user.email.to_lowercase();
                let taken = doc
                    .rows::<NewUser>(USERS)?
                    .iter()
                    .any(|(_, u)| u.email.to_lowercase() == email);
                if taken {
                    return Err(Error::EmailTaken(USER_EMAIL_TAKEN.to_string()));
                }

                let id = doc.add(USERS, user)?;
                doc.log(
                    &self.actor,
                    "Crear usuario",
                    format!("Usuario {} creado con rol {}", user.name, user.role),
                );
                Ok(id)
            })
            .await
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>> {
        self.store
            .read(|doc| {
                let mut appointments = Vec::new();
                for (id, appt) in doc.rows::<NewAppointment>(APPOINTMENTS)? {
                    // Appointments of deleted clients drop out, like an inner join.
                    let client_name = match client_name(doc, appt.client_id)? {
                        Some(name) => name,
                        None => continue,
                    };
                    let staff_name = match appt.staff_id {
                        Some(staff_id) => staff_name(doc, staff_id)?,
                        None => None,
                    };

                    appointments.push(Appointment {
                        id,
                        client_name,
                        staff_name,
                        scheduled_start: appt.scheduled_start,
                        scheduled_end: appt.scheduled_end,
                        status: appt.status,
                        notes: appt.notes,
                    });
                }

                appointments.sort_by(|a, b| b.scheduled_start.cmp(&a.scheduled_start));
                Ok(appointments)
            })
            .await
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> Result<i64> {
        self.store
            .write(|doc| {
                let name = client_name(doc, appointment.client_id)?
                    .ok_or_else(|| Error::NotFound(format!("client {}", appointment.client_id)))?;
                let id = doc.add(APPOINTMENTS, appointment)?;
                doc.log(
                    &self.actor,
                    "Crear cita",
                    format!("Cita de {} para {}", name, appointment.scheduled_start),
                );
                Ok(id)
            })
            .await
    }

    async fn update_appointment_status(&self, id: i64, status: &str) -> Result<()> {
        self.store
            .write(|doc| {
                let mut appt = doc
                    .row::<NewAppointment>(APPOINTMENTS, id)?
                    .ok_or_else(|| Error::NotFound(format!("appointment {}", id)))?;
                appt.status = status.to_string();
                doc.update(APPOINTMENTS, id, &appt)?;
                doc.log(
                    &self.actor,
                    "Actualizar cita",
                    format!("Cita #{} marcada como {}", id, status),
                );
                Ok(())
            })
            .await
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        self.store
            .read(|doc| {
                let mut invoices = Vec::new();
                for (id, row) in doc.rows::<InvoiceRow>(INVOICES)? {
                    if let Some(name) = client_name(doc, row.client_id)? {
                        invoices.push(Invoice {
                            id,
                            invoice_number: row.invoice_number,
                            issued_at: row.issued_at,
                            client_name: name,
                            total: row.total_amount,
                            status: row.status,
                        });
                    }
                }

                invoices.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then(b.id.cmp(&a.id)));
                Ok(invoices)
            })
            .await
    }

    async fn read_invoice(&self, id: i64) -> Result<InvoiceDetail> {
        self.store
            .read(|doc| {
                let not_found = || Error::NotFound(format!("invoice {}", id));
                let row = doc.row::<InvoiceRow>(INVOICES, id)?.ok_or_else(not_found)?;
                let name = client_name(doc, row.client_id)?.ok_or_else(not_found)?;

                let lines = doc
                    .rows::<InvoiceLineRow>(INVOICE_LINES)?
                    .into_iter()
                    .filter(|(_, l)| l.invoice_id == id)
                    .map(|(line_id, l)| InvoiceLine {
                        id: line_id,
                        service_id: Some(l.line.service_id),
                        description: l.line.description,
                        quantity: l.line.quantity,
                        unit_price: l.line.unit_price,
                        line_total: l.line.line_total,
                    })
                    .collect();

                let payment = doc
                    .rows::<PaymentRow>(PAYMENTS)?
                    .into_iter()
                    .find(|(_, p)| p.invoice_id == id)
                    .map(|(payment_id, p)| Payment {
                        id: payment_id,
                        amount: p.amount,
                        method: p.method,
                        paid_at: p.paid_at,
                    });

                Ok(InvoiceDetail {
                    invoice: Invoice {
                        id,
                        invoice_number: row.invoice_number,
                        issued_at: row.issued_at,
                        client_name: name,
                        total: row.total_amount,
                        status: row.status,
                    },
                    lines,
                    payment,
                })
            })
            .await
    }

    async fn create_invoice(
        &self,
        invoice: &InvoiceForm,
        issued_at: NaiveDateTime,
    ) -> Result<CreatedInvoice> {
        let issued_at = issued_at.format(DATETIME_FORMAT).to_string();

        self.store
            .write(|doc| {
                let name = client_name(doc, invoice.client_id)?
                    .ok_or_else(|| Error::NotFound(format!("client {}", invoice.client_id)))?;

                let total = invoice.total();
                let invoice_number = format_invoice_number(doc.next_sequence(INVOICE_SEQUENCE));
                let invoice_id = doc.add(
                    INVOICES,
                    &InvoiceRow {
                        invoice_number: invoice_number.clone(),
                        client_id: invoice.client_id,
                        appointment_id: invoice.appointment_id,
                        issued_at: issued_at.clone(),
                        total_amount: total,
                        status: STATUS_PAID.to_string(),
                    },
                )?;

                for line in invoice.lines() {
                    if doc.find_by_id(SERVICES, line.service_id).is_none() {
                        return Err(Error::NotFound(format!("service {}", line.service_id)));
                    }
                    doc.add(INVOICE_LINES, &InvoiceLineRow { invoice_id, line })?;
                }

                doc.add(
                    PAYMENTS,
                    &PaymentRow {
                        invoice_id,
                        amount: total,
                        method: invoice.payment_method.as_str().to_string(),
                        paid_at: issued_at.clone(),
                    },
                )?;

                doc.log(
                    &self.actor,
                    "Crear factura",
                    format!("Factura {} para {} por {:.2}", invoice_number, name, total),
                );

                Ok(CreatedInvoice {
                    invoice_id,
                    invoice_number,
                    total,
                })
            })
            .await
    }

    async fn list_attendance(&self, date: Option<NaiveDate>) -> Result<Vec<Attendance>> {
        self.store
            .read(|doc| {
                let day = date.map(|d| d.format(crate::models::DATE_FORMAT).to_string());

                let mut attendance = Vec::new();
                for (id, row) in doc.rows::<NewAttendance>(ATTENDANCE)? {
                    if day.as_ref().map_or(false, |d| *d != row.date_worked) {
                        continue;
                    }
                    if let Some(employee_name) = staff_name(doc, row.staff_id)? {
                        attendance.push(Attendance {
                            id,
                            employee_name,
                            date: row.date_worked,
                            check_in: row.check_in,
                            check_out: row.check_out,
                            break_minutes: row.break_minutes,
                        });
                    }
                }

                attendance.sort_by(|a, b| b.date.cmp(&a.date).then(b.check_in.cmp(&a.check_in)));
                Ok(attendance)
            })
            .await
    }

    async fn create_attendance(&self, attendance: &NewAttendance) -> Result<i64> {
        self.store
            .write(|doc| {
                let name = staff_name(doc, attendance.staff_id)?
                    .ok_or_else(|| Error::NotFound(format!("staff {}", attendance.staff_id)))?;
                let id = doc.add(ATTENDANCE, attendance)?;
                doc.log(
                    &self.actor,
                    "Registrar asistencia",
                    format!("Entrada de {} el {}", name, attendance.date_worked),
                );
                Ok(id)
            })
            .await
    }

    async fn income_report(&self, start: NaiveDate, end: NaiveDate) -> Result<IncomeReport> {
        self.store
            .read(|doc| {
                let totals: Vec<f64> = doc
                    .rows::<InvoiceRow>(INVOICES)?
                    .into_iter()
                    .filter(|(_, inv)| inv.paid_within(start, end))
                    .map(|(_, inv)| inv.total_amount)
                    .collect();

                let total_ingresos: f64 = totals.iter().sum();
                let promedio_factura = if totals.is_empty() {
                    0.0
                } else {
                    total_ingresos / totals.len() as f64
                };

                Ok(IncomeReport {
                    total_facturas: totals.len() as i64,
                    total_ingresos,
                    promedio_factura,
                })
            })
            .await
    }

    async fn services_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ServiceSales>> {
        self.store
            .read(|doc| {
                let invoices = doc.rows::<InvoiceRow>(INVOICES)?;
                let mut sales: IndexMap<String, ServiceSales> = IndexMap::new();

                for (_, l) in doc.rows::<InvoiceLineRow>(INVOICE_LINES)? {
                    let counted = invoices
                        .iter()
                        .any(|(id, inv)| *id == l.invoice_id && inv.paid_within(start, end));
                    if !counted {
                        continue;
                    }
                    let service = match doc.row::<ServiceRow>(SERVICES, l.line.service_id)? {
                        Some(row) => row.service.name,
                        None => continue,
                    };

                    let entry = sales.entry(service.clone()).or_insert(ServiceSales {
                        servicio: service,
                        cantidad: 0,
                        total_ventas: 0.0,
                    });
                    entry.cantidad += 1;
                    entry.total_ventas += l.line.line_total;
                }

                let mut sales: Vec<ServiceSales> = sales.into_values().collect();
                sales.sort_by(|a, b| b.total_ventas.total_cmp(&a.total_ventas));
                Ok(sales)
            })
            .await
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        self.store
            .read(|doc| {
                let mut campaigns: Vec<Campaign> = doc
                    .rows::<CampaignForm>(CAMPAIGNS)?
                    .into_iter()
                    .map(|(id, c)| Campaign {
                        id,
                        name: c.name,
                        channel: c.channel,
                        start_date: c.start_date,
                        end_date: c.end_date,
                        budget: c.budget,
                    })
                    .collect();

                campaigns.sort_by(|a, b| b.start_date.cmp(&a.start_date));
                Ok(campaigns)
            })
            .await
    }

    async fn create_campaign(&self, campaign: &CampaignForm) -> Result<i64> {
        self.store
            .write(|doc| {
                let id = doc.add(CAMPAIGNS, campaign)?;
                doc.log(
                    &self.actor,
                    "Crear campaña",
                    format!("Campaña {} en {}", campaign.name, campaign.channel),
                );
                Ok(id)
            })
            .await
    }

    async fn audit_log(&self) -> Result<Vec<AuditEntry>> {
        self.store.read(|doc| Ok(doc.audit_log())).await
    }
}
