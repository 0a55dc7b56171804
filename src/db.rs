use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::OnceCell;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::models::{
    format_invoice_number, Appointment, Attendance, Campaign, CampaignForm, Client,
    CreatedInvoice, IncomeReport, Invoice, InvoiceDetail, InvoiceForm, InvoiceLine,
    NewAppointment, NewAttendance, NewClient, NewService, NewStaff, NewUser, Payment, Service,
    ServiceSales, Staff, User, DATETIME_FORMAT, DATE_FORMAT, STATUS_PAID,
};
use crate::repository::Repository;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS clients (
        id INTEGER PRIMARY KEY,
        first_name TEXT,
        last_name TEXT NOT NULL DEFAULT '',
        phone TEXT,
        email TEXT,
        notes TEXT,
        marketing_consent BOOLEAN NOT NULL DEFAULT 0
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS clients_email_nocase
        ON clients(email COLLATE NOCASE) WHERE email IS NOT NULL",
    "CREATE TABLE IF NOT EXISTS services (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        duration_min INTEGER NOT NULL,
        base_price REAL NOT NULL,
        active BOOLEAN NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS staff (
        id INTEGER PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL DEFAULT '',
        role TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY,
        client_id INTEGER NOT NULL REFERENCES clients(id),
        staff_id INTEGER REFERENCES staff(id),
        scheduled_start TEXT NOT NULL,
        scheduled_end TEXT NOT NULL,
        status TEXT NOT NULL,
        notes TEXT
    )",
    "CREATE TABLE IF NOT EXISTS invoice_sequence (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        value INTEGER NOT NULL
    )",
    "INSERT OR IGNORE INTO invoice_sequence(id, value) VALUES(1, 0)",
    "CREATE TABLE IF NOT EXISTS invoices (
        id INTEGER PRIMARY KEY,
        invoice_number TEXT NOT NULL UNIQUE,
        client_id INTEGER NOT NULL REFERENCES clients(id),
        appointment_id INTEGER REFERENCES appointments(id),
        issued_at TEXT NOT NULL,
        total_amount REAL NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS invoice_lines (
        id INTEGER PRIMARY KEY,
        invoice_id INTEGER NOT NULL REFERENCES invoices(id),
        service_id INTEGER REFERENCES services(id),
        description TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        unit_price REAL NOT NULL,
        line_total REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS payments (
        id INTEGER PRIMARY KEY,
        invoice_id INTEGER NOT NULL UNIQUE REFERENCES invoices(id),
        amount REAL NOT NULL,
        paid_at TEXT NOT NULL,
        method TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS attendance (
        id INTEGER PRIMARY KEY,
        staff_id INTEGER NOT NULL REFERENCES staff(id),
        date_worked TEXT NOT NULL,
        check_in TEXT NOT NULL,
        check_out TEXT,
        break_minutes INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS marketing_campaigns (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        channel TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        budget REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS admin_users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        role TEXT NOT NULL,
        status TEXT NOT NULL,
        permissions TEXT NOT NULL DEFAULT '[]'
    )",
];

pub(crate) const EMAIL_TAKEN: &str = "Ya existe un cliente con ese correo electrónico";
pub(crate) const EMAIL_TAKEN_OTHER: &str = "Ya existe otro cliente con ese correo electrónico";
pub(crate) const USER_EMAIL_TAKEN: &str = "El correo ya está registrado";

/// Lazily opened, process-wide database handle.
///
/// The first call to [`Database::pool`] connects and creates the schema; every
/// later call gets the same pool back. The pool holds a single connection, so
/// statements run one at a time. A dropped connection is not re-established.
pub struct Database {
    url: String,
    pool: OnceCell<SqlitePool>,
}

impl Database {
    pub fn new(url: impl Into<String>) -> Self {
        Database {
            url: url.into(),
            pool: OnceCell::new(),
        }
    }

    pub async fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                let pool = setup_pool(&self.url).await?;
                setup_db(&pool).await?;
                info!(url = %self.url, "Connected to database");
                Ok::<_, Error>(pool)
            })
            .await
    }
}

pub async fn setup_pool(db_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    Ok(SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?)
}

pub async fn setup_db(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

fn unique_email(err: sqlx::Error, message: &str) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::EmailTaken(message.to_string())
        }
        _ => err.into(),
    }
}

fn expect_row(rows_affected: u64, what: &str, id: i64) -> Result<()> {
    if rows_affected == 0 {
        return Err(Error::NotFound(format!("{} {}", what, id)));
    }
    Ok(())
}

// Clients

pub async fn read_all_clients(pool: &SqlitePool) -> Result<Vec<Client>> {
    Ok(sqlx::query_as::<_, Client>(
        "SELECT c.id AS id,
            TRIM(c.first_name || ' ' || c.last_name) AS name,
            c.email AS email,
            c.phone AS phone,
            c.notes AS address,
            (SELECT COUNT(*) FROM invoice_lines il
                INNER JOIN invoices i ON il.invoice_id = i.id
                WHERE i.client_id = c.id) AS services
        FROM clients c
        WHERE c.first_name IS NOT NULL
        ORDER BY c.id DESC",
    )
    .fetch_all(pool)
    .await?)
}

/// Id of a client using `email`, ignoring `exclude`.
pub async fn find_client_by_email(
    pool: &SqlitePool,
    email: &str,
    exclude: Option<i64>,
) -> Result<Option<i64>> {
    let rec: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM clients WHERE email = ? COLLATE NOCASE AND id != ? LIMIT 1")
            .bind(email)
            .bind(exclude.unwrap_or(-1))
            .fetch_optional(pool)
            .await?;

    Ok(rec.map(|r| r.0))
}

pub async fn write_client(pool: &SqlitePool, client: &NewClient) -> Result<i64> {
    // Check and insert are separate statements; the unique index catches a lost race.
    if let Some(email) = &client.email {
        if find_client_by_email(pool, email, None).await?.is_some() {
            return Err(Error::EmailTaken(EMAIL_TAKEN.to_string()));
        }
    }

    insert_client(pool, client).await
}

/// Inserts without the email pre-check; a duplicate still fails on the index.
pub(crate) async fn insert_client(pool: &SqlitePool, client: &NewClient) -> Result<i64> {
    let res = sqlx::query(
        "INSERT INTO clients(first_name, last_name, phone, email, notes, marketing_consent)
        VALUES(?, ?, ?, ?, ?, 0)",
    )
    .bind(&client.first_name)
    .bind(&client.last_name)
    .bind(&client.phone)
    .bind(&client.email)
    .bind(&client.notes)
    .execute(pool)
    .await
    .map_err(|e| unique_email(e, EMAIL_TAKEN))?;

    Ok(res.last_insert_rowid())
}

pub async fn update_client(pool: &SqlitePool, id: i64, client: &NewClient) -> Result<()> {
    if let Some(email) = &client.email {
        if find_client_by_email(pool, email, Some(id)).await?.is_some() {
            return Err(Error::EmailTaken(EMAIL_TAKEN_OTHER.to_string()));
        }
    }

    let res = sqlx::query(
        "UPDATE clients SET first_name=?, last_name=?, phone=?, email=?, notes=?
        WHERE id=?",
    )
    .bind(&client.first_name)
    .bind(&client.last_name)
    .bind(&client.phone)
    .bind(&client.email)
    .bind(&client.notes)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| unique_email(e, EMAIL_TAKEN_OTHER))?;

    expect_row(res.rows_affected(), "client", id)
}

pub async fn delete_client(pool: &SqlitePool, id: i64) -> Result<()> {
    let res = sqlx::query("DELETE FROM clients WHERE id=?")
        .bind(id)
        .execute(pool)
        .await?;

    expect_row(res.rows_affected(), "client", id)
}

// Services

pub async fn read_all_services(pool: &SqlitePool) -> Result<Vec<Service>> {
    Ok(sqlx::query_as::<_, Service>(
        "SELECT id, name, description, duration_min AS duration, base_price AS price, active
        FROM services
        WHERE active = 1
        ORDER BY name",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn write_service(pool: &SqlitePool, service: &NewService) -> Result<i64> {
    let res = sqlx::query(
        "INSERT INTO services(name, description, duration_min, base_price, active)
        VALUES(?, ?, ?, ?, 1)",
    )
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.duration)
    .bind(service.price)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

pub async fn update_service(pool: &SqlitePool, id: i64, service: &NewService) -> Result<()> {
    let res = sqlx::query(
        "UPDATE services SET name=?, description=?, duration_min=?, base_price=?
        WHERE id=?",
    )
    .bind(&service.name)
    .bind(&service.description)
    .bind(service.duration)
    .bind(service.price)
    .bind(id)
    .execute(pool)
    .await?;

    expect_row(res.rows_affected(), "service", id)
}

pub async fn delete_service(pool: &SqlitePool, id: i64) -> Result<()> {
    let res = sqlx::query("DELETE FROM services WHERE id=?")
        .bind(id)
        .execute(pool)
        .await?;

    expect_row(res.rows_affected(), "service", id)
}

// Staff

pub async fn read_all_staff(pool: &SqlitePool) -> Result<Vec<Staff>> {
    Ok(sqlx::query_as::<_, Staff>(
        "SELECT id, TRIM(first_name || ' ' || last_name) AS name, role, is_active AS active
        FROM staff
        WHERE is_active = 1
        ORDER BY first_name",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn write_staff(pool: &SqlitePool, staff: &NewStaff) -> Result<i64> {
    let res = sqlx::query(
        "INSERT INTO staff(first_name, last_name, role, is_active) VALUES(?, ?, ?, 1)",
    )
    .bind(&staff.first_name)
    .bind(&staff.last_name)
    .bind(&staff.role)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

// Admin users

pub async fn read_all_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows: Vec<(i64, String, String, String, String, String)> = sqlx::query_as(
        "SELECT id, name, email, role, status, permissions FROM admin_users ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, name, email, role, status, permissions)| -> Result<User> {
            Ok(User {
                id,
                name,
                email,
                role,
                status,
                permissions: serde_json::from_str(&permissions)?,
            })
        })
        .collect()
}

pub async fn write_user(pool: &SqlitePool, user: &NewUser) -> Result<i64> {
    let taken: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM admin_users WHERE email = ? COLLATE NOCASE LIMIT 1")
            .bind(&user.email)
            .fetch_optional(pool)
            .await?;
    if taken.is_some() {
        return Err(Error::EmailTaken(USER_EMAIL_TAKEN.to_string()));
    }

    let res = sqlx::query(
        "INSERT INTO admin_users(name, email, role, status, permissions) VALUES(?, ?, ?, ?, ?)",
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.role)
    .bind(&user.status)
    .bind(serde_json::to_string(&user.permissions)?)
    .execute(pool)
    .await
    .map_err(|e| unique_email(e, USER_EMAIL_TAKEN))?;

    Ok(res.last_insert_rowid())
}

// Appointments

pub async fn read_all_appointments(pool: &SqlitePool) -> Result<Vec<Appointment>> {
    Ok(sqlx::query_as::<_, Appointment>(
        "SELECT a.id AS id,
            TRIM(c.first_name || ' ' || c.last_name) AS client_name,
            TRIM(s.first_name || ' ' || s.last_name) AS staff_name,
            a.scheduled_start AS scheduled_start,
            a.scheduled_end AS scheduled_end,
            a.status AS status,
            a.notes AS notes
        FROM appointments a
        INNER JOIN clients c ON a.client_id = c.id
        LEFT JOIN staff s ON a.staff_id = s.id
        ORDER BY a.scheduled_start DESC",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn write_appointment(pool: &SqlitePool, appointment: &NewAppointment) -> Result<i64> {
    let res = sqlx::query(
        "INSERT INTO appointments(client_id, staff_id, scheduled_start, scheduled_end, status, notes)
        VALUES(?, ?, ?, ?, ?, ?)",
    )
    .bind(appointment.client_id)
    .bind(appointment.staff_id)
    .bind(&appointment.scheduled_start)
    .bind(&appointment.scheduled_end)
    .bind(&appointment.status)
    .bind(&appointment.notes)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

pub async fn update_appointment_status(pool: &SqlitePool, id: i64, status: &str) -> Result<()> {
    let res = sqlx::query("UPDATE appointments SET status=? WHERE id=?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;

    expect_row(res.rows_affected(), "appointment", id)
}

// Invoices

const INVOICE_SELECT: &str = "SELECT i.id AS id,
        i.invoice_number AS invoice_number,
        i.issued_at AS issued_at,
        TRIM(c.first_name || ' ' || c.last_name) AS client_name,
        i.total_amount AS total,
        i.status AS status
    FROM invoices i
    INNER JOIN clients c ON i.client_id = c.id";

pub async fn read_all_invoices(pool: &SqlitePool) -> Result<Vec<Invoice>> {
    let query = format!("{} ORDER BY i.issued_at DESC, i.id DESC", INVOICE_SELECT);
    Ok(sqlx::query_as::<_, Invoice>(&query).fetch_all(pool).await?)
}

pub async fn read_invoice(pool: &SqlitePool, id: i64) -> Result<InvoiceDetail> {
    let query = format!("{} WHERE i.id = ?", INVOICE_SELECT);
    let invoice = sqlx::query_as::<_, Invoice>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("invoice {}", id)))?;

    let lines = sqlx::query_as::<_, InvoiceLine>(
        "SELECT id, service_id, description, quantity, unit_price, line_total
        FROM invoice_lines
        WHERE invoice_id = ?
        ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let payment = sqlx::query_as::<_, Payment>(
        "SELECT id, amount, method, paid_at FROM payments WHERE invoice_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(InvoiceDetail {
        invoice,
        lines,
        payment,
    })
}

/// Numbers, writes and pays an invoice inside one transaction.
///
/// Any failure rolls back the header, every line and the sequence bump.
#[instrument(skip(pool, invoice), fields(client_id = invoice.client_id))]
pub async fn write_invoice(
    pool: &SqlitePool,
    invoice: &InvoiceForm,
    issued_at: NaiveDateTime,
) -> Result<CreatedInvoice> {
    let issued_at = issued_at.format(DATETIME_FORMAT).to_string();
    let total = invoice.total();

    let mut tx = pool.begin().await?;

    let client: Option<(i64,)> = sqlx::query_as("SELECT id FROM clients WHERE id = ?")
        .bind(invoice.client_id)
        .fetch_optional(&mut *tx)
        .await?;
    if client.is_none() {
        return Err(Error::NotFound(format!("client {}", invoice.client_id)));
    }

    sqlx::query("UPDATE invoice_sequence SET value = value + 1 WHERE id = 1")
        .execute(&mut *tx)
        .await?;
    let seq: (i64,) = sqlx::query_as("SELECT value FROM invoice_sequence WHERE id = 1")
        .fetch_one(&mut *tx)
        .await?;
    let invoice_number = format_invoice_number(seq.0);

    let invoice_id = sqlx::query(
        "INSERT INTO invoices(invoice_number, client_id, appointment_id, issued_at, total_amount, status)
        VALUES(?, ?, ?, ?, ?, ?)",
    )
    .bind(&invoice_number)
    .bind(invoice.client_id)
    .bind(invoice.appointment_id)
    .bind(&issued_at)
    .bind(total)
    .bind(STATUS_PAID)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for line in invoice.lines() {
        // Dropping `tx` on this early return rolls back the header.
        let service: Option<(i64,)> = sqlx::query_as("SELECT id FROM services WHERE id = ?")
            .bind(line.service_id)
            .fetch_optional(&mut *tx)
            .await?;
        if service.is_none() {
            return Err(Error::NotFound(format!("service {}", line.service_id)));
        }

        sqlx::query(
            "INSERT INTO invoice_lines(invoice_id, service_id, description, quantity, unit_price, line_total)
            VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(invoice_id)
        .bind(line.service_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.line_total)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("INSERT INTO payments(invoice_id, amount, paid_at, method) VALUES(?, ?, ?, ?)")
        .bind(invoice_id)
        .bind(total)
        .bind(&issued_at)
        .bind(invoice.payment_method.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(CreatedInvoice {
        invoice_id,
        invoice_number,
        total,
    })
}

// Attendance

pub async fn read_attendance(pool: &SqlitePool, date: Option<NaiveDate>) -> Result<Vec<Attendance>> {
    let mut query = String::from(
        "SELECT a.id AS id,
            TRIM(s.first_name || ' ' || s.last_name) AS employee_name,
            a.date_worked AS date,
            a.check_in AS check_in,
            a.check_out AS check_out,
            a.break_minutes AS break_minutes
        FROM attendance a
        INNER JOIN staff s ON a.staff_id = s.id",
    );

    if date.is_some() {
        query.push_str(" WHERE date(a.date_worked) = ?");
    }
    query.push_str(" ORDER BY a.date_worked DESC, a.check_in DESC");

    let mut q = sqlx::query_as::<_, Attendance>(&query);
    if let Some(date) = date {
        q = q.bind(date.format(DATE_FORMAT).to_string());
    }

    Ok(q.fetch_all(pool).await?)
}

pub async fn write_attendance(pool: &SqlitePool, attendance: &NewAttendance) -> Result<i64> {
    let res = sqlx::query(
        "INSERT INTO attendance(staff_id, date_worked, check_in, check_out, break_minutes)
        VALUES(?, ?, ?, ?, ?)",
    )
    .bind(attendance.staff_id)
    .bind(&attendance.date_worked)
    .bind(&attendance.check_in)
    .bind(&attendance.check_out)
    .bind(attendance.break_minutes)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

// Reports

pub async fn income_report(pool: &SqlitePool, start: NaiveDate, end: NaiveDate) -> Result<IncomeReport> {
    Ok(sqlx::query_as::<_, IncomeReport>(
        "SELECT COUNT(*) AS total_facturas,
            COALESCE(SUM(total_amount), 0.0) AS total_ingresos,
            COALESCE(AVG(total_amount), 0.0) AS promedio_factura
        FROM invoices
        WHERE date(issued_at) BETWEEN ? AND ?
            AND status = ?",
    )
    .bind(start.format(DATE_FORMAT).to_string())
    .bind(end.format(DATE_FORMAT).to_string())
    .bind(STATUS_PAID)
    .fetch_one(pool)
    .await?)
}

pub async fn services_report(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ServiceSales>> {
    Ok(sqlx::query_as::<_, ServiceSales>(
        "SELECT s.name AS servicio,
            COUNT(il.id) AS cantidad,
            SUM(il.line_total) AS total_ventas
        FROM invoice_lines il
        INNER JOIN services s ON il.service_id = s.id
        INNER JOIN invoices i ON il.invoice_id = i.id
        WHERE date(i.issued_at) BETWEEN ? AND ?
            AND i.status = ?
        GROUP BY s.name
        ORDER BY total_ventas DESC",
    )
    .bind(start.format(DATE_FORMAT).to_string())
    .bind(end.format(DATE_FORMAT).to_string())
    .bind(STATUS_PAID)
    .fetch_all(pool)
    .await?)
}

// Marketing

pub async fn read_all_campaigns(pool: &SqlitePool) -> Result<Vec<Campaign>> {
    Ok(sqlx::query_as::<_, Campaign>(
        "SELECT id, name, channel, start_date, end_date, budget
        FROM marketing_campaigns
        ORDER BY start_date DESC",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn write_campaign(pool: &SqlitePool, campaign: &CampaignForm) -> Result<i64> {
    let res = sqlx::query(
        "INSERT INTO marketing_campaigns(name, channel, start_date, end_date, budget)
        VALUES(?, ?, ?, ?, ?)",
    )
    .bind(&campaign.name)
    .bind(&campaign.channel)
    .bind(&campaign.start_date)
    .bind(&campaign.end_date)
    .bind(campaign.budget)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// SQL-backed [`Repository`].
pub struct SqliteRepository {
    db: Database,
}

impl SqliteRepository {
    pub fn new(db: Database) -> Self {
        SqliteRepository { db }
    }

    pub async fn pool(&self) -> Result<&SqlitePool> {
        self.db.pool().await
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn list_clients(&self) -> Result<Vec<Client>> {
        read_all_clients(self.pool().await?).await
    }

    async fn create_client(&self, client: &NewClient) -> Result<i64> {
        write_client(self.pool().await?, client).await
    }

    async fn update_client(&self, id: i64, client: &NewClient) -> Result<()> {
        update_client(self.pool().await?, id, client).await
    }

    async fn delete_client(&self, id: i64) -> Result<()> {
        delete_client(self.pool().await?, id).await
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        read_all_services(self.pool().await?).await
    }

    async fn create_service(&self, service: &NewService) -> Result<i64> {
        write_service(self.pool().await?, service).await
    }

    async fn update_service(&self, id: i64, service: &NewService) -> Result<()> {
        update_service(self.pool().await?, id, service).await
    }

    async fn delete_service(&self, id: i64) -> Result<()> {
        delete_service(self.pool().await?, id).await
    }

    async fn list_staff(&self) -> Result<Vec<Staff>> {
        read_all_staff(self.pool().await?).await
    }

    async fn create_staff(&self, staff: &NewStaff) -> Result<i64> {
        write_staff(self.pool().await?, staff).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        read_all_users(self.pool().await?).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<i64> {
        write_user(self.pool().await?, user).await
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>> {
        read_all_appointments(self.pool().await?).await
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> Result<i64> {
        write_appointment(self.pool().await?, appointment).await
    }

    async fn update_appointment_status(&self, id: i64, status: &str) -> Result<()> {
        update_appointment_status(self.pool().await?, id, status).await
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        read_all_invoices(self.pool().await?).await
    }

    async fn read_invoice(&self, id: i64) -> Result<InvoiceDetail> {
        read_invoice(self.pool().await?, id).await
    }

    async fn create_invoice(
        &self,
        invoice: &InvoiceForm,
        issued_at: NaiveDateTime,
    ) -> Result<CreatedInvoice> {
        write_invoice(self.pool().await?, invoice, issued_at).await
    }

    async fn list_attendance(&self, date: Option<NaiveDate>) -> Result<Vec<Attendance>> {
        read_attendance(self.pool().await?, date).await
    }

    async fn create_attendance(&self, attendance: &NewAttendance) -> Result<i64> {
        write_attendance(self.pool().await?, attendance).await
    }

    async fn income_report(&self, start: NaiveDate, end: NaiveDate) -> Result<IncomeReport> {
        income_report(self.pool().await?, start, end).await
    }

    async fn services_report(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ServiceSales>> {
        services_report(self.pool().await?, start, end).await
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        read_all_campaigns(self.pool().await?).await
    }

    async fn create_campaign(&self, campaign: &CampaignForm) -> Result<i64> {
        write_campaign(self.pool().await?, campaign).await
    }
}
