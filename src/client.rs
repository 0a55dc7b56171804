//! HTTP client for the admin API and the client-side data store.

use anyhow::{anyhow, Context, Result};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config;
use crate::models::{
    Appointment, AppointmentForm, Attendance, AttendanceForm, AuditEntry, Campaign, CampaignForm,
    Client, ClientForm, CreatedInvoice, DateRange, IncomeReport, Invoice,
    InvoiceDetail, InvoiceForm, NewService, Service, ServiceSales, Staff, StaffForm, User,
    UserForm,
};

/// One method per API route.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Reads `BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Ok(ApiClient::new(config::base_url()?))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let res = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET /api/{} failed", path))?;
        parse(res).await
    }

    async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let res = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET /api/{} failed", path))?;
        parse(res).await
    }

    async fn send<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Value> {
        let mut req = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req
            .send()
            .await
            .with_context(|| format!("{} /api/{} failed", method, path))?;
        parse(res).await
    }

    async fn create<B: Serialize + ?Sized>(&self, path: &str, body: &B, key: &str) -> Result<i64> {
        let reply = self.send(Method::POST, path, Some(body)).await?;
        reply[key]
            .as_i64()
            .ok_or_else(|| anyhow!("response to POST /api/{} has no {}", path, key))
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>> {
        self.get("clientes").await
    }

    pub async fn create_client(&self, form: &ClientForm) -> Result<i64> {
        self.create("clientes", form, "clientId").await
    }

    pub async fn update_client(&self, id: i64, form: &ClientForm) -> Result<()> {
        self.send(Method::PUT, &format!("clientes/{}", id), Some(form)).await?;
        Ok(())
    }

    pub async fn delete_client(&self, id: i64) -> Result<()> {
        self.send::<()>(Method::DELETE, &format!("clientes/{}", id), None)
            .await?;
        Ok(())
    }

    pub async fn list_services(&self) -> Result<Vec<Service>> {
        self.get("servicios").await
    }

    pub async fn create_service(&self, service: &NewService) -> Result<i64> {
        self.create("servicios", service, "serviceId").await
    }

    pub async fn update_service(&self, id: i64, service: &NewService) -> Result<()> {
        self.send(Method::PUT, &format!("servicios/{}", id), Some(service))
            .await?;
        Ok(())
    }

    pub async fn delete_service(&self, id: i64) -> Result<()> {
        self.send::<()>(Method::DELETE, &format!("servicios/{}", id), None)
            .await?;
        Ok(())
    }

    pub async fn list_staff(&self) -> Result<Vec<Staff>> {
        self.get("staff").await
    }

    pub async fn create_staff(&self, form: &StaffForm) -> Result<i64> {
        self.create("staff", form, "staffId").await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.get("usuarios").await
    }

    pub async fn create_user(&self, form: &UserForm) -> Result<i64> {
        self.create("usuarios", form, "userId").await
    }

    pub async fn list_appointments(&self) -> Result<Vec<Appointment>> {
        self.get("citas").await
    }

    pub async fn create_appointment(&self, form: &AppointmentForm) -> Result<i64> {
        self.create("citas", form, "appointmentId").await
    }

    pub async fn update_appointment_status(&self, id: i64, status: &str) -> Result<()> {
        let body = serde_json::json!({ "status": status });
        self.send(Method::PUT, &format!("citas/{}/status", id), Some(&body))
            .await?;
        Ok(())
    }

    pub async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        self.get("facturas").await
    }

    pub async fn read_invoice(&self, id: i64) -> Result<InvoiceDetail> {
        self.get(&format!("facturas/{}", id)).await
    }

    pub async fn create_invoice(&self, form: &InvoiceForm) -> Result<CreatedInvoice> {
        let reply = self.send(Method::POST, "facturas", Some(form)).await?;
        serde_json::from_value(reply).context("unexpected response to POST /api/facturas")
    }

    pub async fn list_attendance(&self, date: Option<&str>) -> Result<Vec<Attendance>> {
        match date {
            Some(date) => self.get_with("asistencias", &[("date", date)]).await,
            None => self.get("asistencias").await,
        }
    }

    pub async fn create_attendance(&self, form: &AttendanceForm) -> Result<i64> {
        self.create("asistencias", form, "attendanceId").await
    }

    pub async fn income_report(&self, range: &DateRange) -> Result<IncomeReport> {
        self.get_with("reportes/ingresos", range).await
    }

    pub async fn services_report(&self, range: &DateRange) -> Result<Vec<ServiceSales>> {
        self.get_with("reportes/servicios", range).await
    }

    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        self.get("marketing/campanas").await
    }

    pub async fn create_campaign(&self, form: &CampaignForm) -> Result<i64> {
        self.create("marketing/campanas", form, "campaignId").await
    }

    pub async fn audit_log(&self) -> Result<Vec<AuditEntry>> {
        self.get("bitacora").await
    }
}

/// Non-2xx replies become errors carrying the server's `error` message.
async fn parse<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();
    if !status.is_success() {
        let body: Value = res.json().await.unwrap_or_default();
        let message = body["error"].as_str().unwrap_or("request failed");
        return Err(anyhow!("{} ({})", message, status));
    }

    Ok(res.json().await?)
}

/// Last-fetched collections, one per resource.
///
/// A failed refresh leaves an empty collection behind; callers cannot tell
/// "no data" from "request failed" apart from the logged warning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    pub clients: Vec<Client>,
    pub services: Vec<Service>,
    pub staff: Vec<Staff>,
    pub users: Vec<User>,
    pub appointments: Vec<Appointment>,
    pub invoices: Vec<Invoice>,
    pub attendance: Vec<Attendance>,
    pub campaigns: Vec<Campaign>,
    pub audit: Vec<AuditEntry>,
    pub income: Option<IncomeReport>,
    pub sales: Vec<ServiceSales>,
}

fn or_empty<T: Default>(res: Result<T>, what: &str) -> T {
    match res {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Failed to load {}", what);
            T::default()
        }
    }
}

impl Store {
    pub async fn refresh_clients(&mut self, api: &ApiClient) {
        self.clients = or_empty(api.list_clients().await, "clients");
    }

    pub async fn refresh_services(&mut self, api: &ApiClient) {
        self.services = or_empty(api.list_services().await, "services");
    }

    pub async fn refresh_staff(&mut self, api: &ApiClient) {
        self.staff = or_empty(api.list_staff().await, "staff");
    }

    pub async fn refresh_users(&mut self, api: &ApiClient) {
        self.users = or_empty(api.list_users().await, "users");
    }

    pub async fn refresh_appointments(&mut self, api: &ApiClient) {
        self.appointments = or_empty(api.list_appointments().await, "appointments");
    }

    pub async fn refresh_invoices(&mut self, api: &ApiClient) {
        self.invoices = or_empty(api.list_invoices().await, "invoices");
    }

    pub async fn refresh_attendance(&mut self, api: &ApiClient, date: Option<&str>) {
        self.attendance = or_empty(api.list_attendance(date).await, "attendance");
    }

    pub async fn refresh_campaigns(&mut self, api: &ApiClient) {
        self.campaigns = or_empty(api.list_campaigns().await, "campaigns");
    }

    pub async fn refresh_audit(&mut self, api: &ApiClient) {
        self.audit = or_empty(api.audit_log().await, "audit log");
    }

    pub async fn refresh_reports(&mut self, api: &ApiClient, range: &DateRange) {
        self.income = api
            .income_report(range)
            .await
            .map_err(|e| warn!(error = %e, "Failed to load income report"))
            .ok();
        self.sales = or_empty(api.services_report(range).await, "sales report");
    }

    /// Everything the menu screens show up front.
    pub async fn refresh_all(&mut self, api: &ApiClient) {
        self.refresh_clients(api).await;
        self.refresh_services(api).await;
        self.refresh_staff(api).await;
        self.refresh_users(api).await;
        self.refresh_appointments(api).await;
        self.refresh_invoices(api).await;
        self.refresh_attendance(api, None).await;
        self.refresh_campaigns(api).await;
        self.refresh_audit(api).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::local::{LocalStore, MockRepository};
    use crate::models::PaymentMethod;
    use crate::models::InvoiceLineForm;
    use std::sync::Arc;

    async fn serve() -> ApiClient {
        let repo: api::SharedRepo = Arc::new(MockRepository::new(LocalStore::in_memory(), "Admin Principal"));
        let (addr, server) = warp::serve(api::api(repo)).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        ApiClient::new(format!("http://{}/", addr))
    }

    fn client_form(name: &str, email: &str) -> ClientForm {
        ClientForm {
            name: name.to_string(),
            email: Some(email.to_string()),
            phone: None,
            address: None,
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let api = ApiClient::new("http://localhost:3000/");
        assert_eq!(api.url("clientes"), "http://localhost:3000/api/clientes");
    }

    #[tokio::test]
    async fn test_client_round_trip_through_server() -> Result<()> {
        let api = serve().await;

        let id = api.create_client(&client_form("Ana Solano", "ana@correo.cr")).await?;
        api.update_client(id, &client_form("Ana María Solano", "ana@correo.cr"))
            .await?;

        let clients = api.list_clients().await?;
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name, "Ana María Solano");

        let dup = api
            .create_client(&client_form("Otra Ana", "ana@correo.cr"))
            .await
            .unwrap_err();
        assert!(dup.to_string().contains("correo"));

        api.delete_client(id).await?;
        assert!(api.list_clients().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_invoice_and_reports_through_server() -> Result<()> {
        let api = serve().await;

        let client_id = api.create_client(&client_form("Luis Mora", "luis@correo.cr")).await?;
        let service = NewService {
            name: "Corte".to_string(),
            description: None,
            duration: 30,
            price: 8000.0,
        };
        let service_id = api.create_service(&service).await?;

        let created = api
            .create_invoice(&InvoiceForm {
                client_id,
                appointment_id: None,
                services: vec![InvoiceLineForm {
                    service_id,
                    name: "Corte".to_string(),
                    price: 8000.0,
                    quantity: Some(2),
                }],
                tax: Some(2080.0),
                tip: None,
                payment_method: PaymentMethod::Card,
            })
            .await?;
        assert_eq!(created.total, 18080.0);

        let detail = api.read_invoice(created.invoice_id).await?;
        assert_eq!(detail.lines[0].quantity, 2);

        let today = chrono::Local::now().date_naive().to_string();
        let range = DateRange {
            start_date: today.clone(),
            end_date: today,
        };

        let mut store = Store::default();
        store.refresh_reports(&api, &range).await;
        assert_eq!(store.income.map(|r| r.total_facturas), Some(1));
        assert_eq!(store.sales[0].cantidad, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_store_refresh_all() -> Result<()> {
        let api = serve().await;
        api.create_staff(&StaffForm {
            name: "Carlos Jiménez".to_string(),
            role: "Barbero".to_string(),
        })
        .await?;

        let mut store = Store::default();
        store.refresh_all(&api).await;

        assert_eq!(store.staff.len(), 1);
        assert_eq!(store.staff[0].name, "Carlos Jiménez");
        assert_eq!(store.audit.len(), 1);
        assert!(store.clients.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_users_through_server() -> Result<()> {
        let api = serve().await;
        let form = UserForm {
            name: "Marta Rojas".to_string(),
            email: "marta@barberia.com".to_string(),
            role: "Recepción".to_string(),
        };

        let id = api.create_user(&form).await?;
        let dup = api.create_user(&form).await.unwrap_err();
        assert!(dup.to_string().contains("El correo ya está registrado"));

        let mut store = Store::default();
        store.refresh_all(&api).await;
        assert_eq!(store.users.len(), 1);
        assert_eq!(store.users[0].id, id);
        assert_eq!(store.audit[0].action, "Crear usuario");

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_refresh_empties_collection() {
        // Nothing listens on port 1.
        let api = ApiClient::new("http://127.0.0.1:1");
        let mut store = Store {
            clients: vec![Client {
                id: 1,
                name: "Ana Solano".to_string(),
                email: None,
                phone: None,
                address: None,
                services: 0,
            }],
            ..Store::default()
        };

        store.refresh_clients(&api).await;
        store.refresh_reports(
            &api,
            &DateRange {
                start_date: "2024-01-01".to_string(),
                end_date: "2024-01-31".to_string(),
            },
        )
        .await;

        assert_eq!(store, Store::default());
    }
}
