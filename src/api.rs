use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{error, instrument};
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::Filter;

use crate::error::{Error, Result};
use crate::models::{
    AppointmentForm, AttendanceForm, AttendanceQuery, CampaignForm, ClientForm, DateRange,
    InvoiceForm, NewService, StaffForm, StatusUpdate, UserForm,
};
use crate::repository::Repository;

pub type SharedRepo = Arc<dyn Repository>;

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(1024 * 16).and(warp::body::json())
}

fn with_repo(repo: SharedRepo) -> impl Filter<Extract = (SharedRepo,), Error = Infallible> + Clone {
    warp::any().map(move || repo.clone())
}

/// The JSON API plus the static front end in `public_dir`.
pub fn routes(
    repo: SharedRepo,
    public_dir: PathBuf,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    let index = warp::path::end().and(warp::fs::file(public_dir.join("index.html")));

    api(repo)
        .or(index)
        .or(warp::fs::dir(public_dir))
        .with(warp::trace::request())
}

pub fn api(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    get_clients(repo.clone())
        .or(post_client(repo.clone()))
        .or(put_client(repo.clone()))
        .or(delete_client(repo.clone()))
        .or(get_services(repo.clone()))
        .or(post_service(repo.clone()))
        .or(put_service(repo.clone()))
        .or(delete_service(repo.clone()))
        .or(get_staff(repo.clone()))
        .or(post_staff(repo.clone()))
        .or(get_users(repo.clone()))
        .or(post_user(repo.clone()))
        .or(get_appointments(repo.clone()))
        .or(post_appointment(repo.clone()))
        .or(put_appointment_status(repo.clone()))
        .or(get_invoices(repo.clone()))
        .or(get_invoice(repo.clone()))
        .or(post_invoice(repo.clone()))
        .or(get_attendance(repo.clone()))
        .or(post_attendance(repo.clone()))
        .or(get_income_report(repo.clone()))
        .or(get_services_report(repo.clone()))
        .or(get_campaigns(repo.clone()))
        .or(post_campaign(repo.clone()))
        .or(get_audit_log(repo))
}

// Filters

pub fn get_clients(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "clientes")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_clients_handler)
}

pub fn post_client(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "clientes")
        .and(warp::post())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(create_client_handler)
}

pub fn put_client(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "clientes" / i64)
        .and(warp::put())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(update_client_handler)
}

pub fn delete_client(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "clientes" / i64)
        .and(warp::delete())
        .and(with_repo(repo))
        .and_then(delete_client_handler)
}

pub fn get_services(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "servicios")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_services_handler)
}

pub fn post_service(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "servicios")
        .and(warp::post())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(create_service_handler)
}

pub fn put_service(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "servicios" / i64)
        .and(warp::put())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(update_service_handler)
}

pub fn delete_service(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "servicios" / i64)
        .and(warp::delete())
        .and(with_repo(repo))
        .and_then(delete_service_handler)
}

pub fn get_staff(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "staff")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_staff_handler)
}

pub fn post_staff(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "staff")
        .and(warp::post())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(create_staff_handler)
}

pub fn get_users(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "usuarios")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_users_handler)
}

pub fn post_user(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "usuarios")
        .and(warp::post())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(create_user_handler)
}

pub fn get_appointments(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "citas")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_appointments_handler)
}

pub fn post_appointment(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "citas")
        .and(warp::post())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(create_appointment_handler)
}

pub fn put_appointment_status(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "citas" / i64 / "status")
        .and(warp::put())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(update_status_handler)
}

pub fn get_invoices(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "facturas")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_invoices_handler)
}

pub fn get_invoice(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "facturas" / i64)
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(read_invoice_handler)
}

pub fn post_invoice(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "facturas")
        .and(warp::post())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(create_invoice_handler)
}

pub fn get_attendance(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "asistencias")
        .and(warp::get())
        .and(warp::query::<AttendanceQuery>())
        .and(with_repo(repo))
        .and_then(list_attendance_handler)
}

pub fn post_attendance(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "asistencias")
        .and(warp::post())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(create_attendance_handler)
}

pub fn get_income_report(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "reportes" / "ingresos")
        .and(warp::get())
        .and(warp::query::<DateRange>())
        .and(with_repo(repo))
        .and_then(income_report_handler)
}

pub fn get_services_report(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "reportes" / "servicios")
        .and(warp::get())
        .and(warp::query::<DateRange>())
        .and(with_repo(repo))
        .and_then(services_report_handler)
}

pub fn get_campaigns(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "marketing" / "campanas")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(list_campaigns_handler)
}

pub fn post_campaign(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "marketing" / "campanas")
        .and(warp::post())
        .and(json_body())
        .and(with_repo(repo))
        .and_then(create_campaign_handler)
}

pub fn get_audit_log(repo: SharedRepo) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "bitacora")
        .and(warp::get())
        .and(with_repo(repo))
        .and_then(audit_log_handler)
}

// Replies

fn listing<T: Serialize>(res: Result<T>, context: &str) -> Response {
    match res {
        Ok(items) => warp::reply::json(&items).into_response(),
        Err(e) => error_reply(e, context),
    }
}

fn created(res: Result<i64>, message: &str, key: &str, context: &str) -> Response {
    match res {
        Ok(id) => {
            let mut body = json!({ "success": true, "message": message });
            body[key] = json!(id);
            warp::reply::json(&body).into_response()
        }
        Err(e) => error_reply(e, context),
    }
}

fn done(res: Result<()>, message: &str, context: &str) -> Response {
    match res {
        Ok(()) => warp::reply::json(&json!({ "success": true, "message": message })).into_response(),
        Err(e) => error_reply(e, context),
    }
}

/// Client errors carry their own message. Everything else is logged and
/// answered with the generic `context` message.
fn error_reply(err: Error, context: &str) -> Response {
    let (status, body) = match &err {
        Error::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": err.to_string() })),
        _ if err.is_client_error() => (
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "error": err.to_string() }),
        ),
        _ => {
            error!(error = %err, "{}", context);
            (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": context }))
        }
    };

    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn required(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

// Handlers

async fn list_clients_handler(repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.list_clients().await, "Error al obtener clientes"))
}

#[instrument(skip(form, repo))]
async fn create_client_handler(form: ClientForm, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    let res = match required(&form.name, "name") {
        Ok(()) => repo.create_client(&form.normalize()).await,
        Err(e) => Err(e),
    };
    Ok(created(res, "Cliente creado exitosamente", "clientId", "Error al crear cliente"))
}

#[instrument(skip(form, repo))]
async fn update_client_handler(
    id: i64,
    form: ClientForm,
    repo: SharedRepo,
) -> std::result::Result<Response, Infallible> {
    let res = match required(&form.name, "name") {
        Ok(()) => repo.update_client(id, &form.normalize()).await,
        Err(e) => Err(e),
    };
    Ok(done(res, "Cliente actualizado", "Error al actualizar cliente"))
}

async fn delete_client_handler(id: i64, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(done(repo.delete_client(id).await, "Cliente eliminado", "Error al eliminar cliente"))
}

async fn list_services_handler(repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.list_services().await, "Error al obtener servicios"))
}

fn check_service(service: &NewService) -> Result<()> {
    required(&service.name, "name")?;
    if service.duration <= 0 {
        return Err(Error::InvalidInput("duration must be positive".to_string()));
    }
    Ok(())
}

async fn create_service_handler(service: NewService, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    let res = match check_service(&service) {
        Ok(()) => repo.create_service(&service).await,
        Err(e) => Err(e),
    };
    Ok(created(res, "Servicio creado", "serviceId", "Error al crear servicio"))
}

async fn update_service_handler(
    id: i64,
    service: NewService,
    repo: SharedRepo,
) -> std::result::Result<Response, Infallible> {
    let res = match check_service(&service) {
        Ok(()) => repo.update_service(id, &service).await,
        Err(e) => Err(e),
    };
    Ok(done(res, "Servicio actualizado", "Error al actualizar servicio"))
}

async fn delete_service_handler(id: i64, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(done(repo.delete_service(id).await, "Servicio eliminado", "Error al eliminar servicio"))
}

async fn list_staff_handler(repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.list_staff().await, "Error al obtener personal"))
}

async fn create_staff_handler(form: StaffForm, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    let res = match required(&form.name, "name") {
        Ok(()) => repo.create_staff(&form.normalize()).await,
        Err(e) => Err(e),
    };
    Ok(created(res, "Personal agregado", "staffId", "Error al agregar personal"))
}

async fn list_users_handler(repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.list_users().await, "Error al obtener usuarios"))
}

#[instrument(skip(form, repo))]
async fn create_user_handler(form: UserForm, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    let res = match form.normalize() {
        Ok(user) => repo.create_user(&user).await,
        Err(e) => Err(e),
    };
    Ok(created(res, "Usuario creado exitosamente", "userId", "Error al crear usuario"))
}

async fn list_appointments_handler(repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.list_appointments().await, "Error al obtener citas"))
}

#[instrument(skip(form, repo))]
async fn create_appointment_handler(
    form: AppointmentForm,
    repo: SharedRepo,
) -> std::result::Result<Response, Infallible> {
    let res = match form.schedule() {
        Ok(appointment) => repo.create_appointment(&appointment).await,
        Err(e) => Err(e),
    };
    Ok(created(res, "Cita creada", "appointmentId", "Error al crear cita"))
}

async fn update_status_handler(
    id: i64,
    update: StatusUpdate,
    repo: SharedRepo,
) -> std::result::Result<Response, Infallible> {
    let res = match required(&update.status, "status") {
        Ok(()) => repo.update_appointment_status(id, update.status.trim()).await,
        Err(e) => Err(e),
    };
    Ok(done(res, "Estado actualizado", "Error al actualizar estado"))
}

async fn list_invoices_handler(repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.list_invoices().await, "Error al obtener facturas"))
}

async fn read_invoice_handler(id: i64, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.read_invoice(id).await, "Error al obtener factura"))
}

#[instrument(skip(form, repo), fields(client_id = form.client_id))]
async fn create_invoice_handler(form: InvoiceForm, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    let context = "Error al crear factura";

    if form.services.is_empty() {
        let err = Error::InvalidInput("an invoice needs at least one service".to_string());
        return Ok(error_reply(err, context));
    }

    match repo.create_invoice(&form, Local::now().naive_local()).await {
        Ok(invoice) => Ok(warp::reply::json(&json!({
            "success": true,
            "message": "Factura creada",
            "invoiceId": invoice.invoice_id,
            "invoiceNumber": invoice.invoice_number,
            "total": invoice.total,
        }))
        .into_response()),
        Err(e) => Ok(error_reply(e, context)),
    }
}

async fn list_attendance_handler(
    query: AttendanceQuery,
    repo: SharedRepo,
) -> std::result::Result<Response, Infallible> {
    let res = match query.date() {
        Ok(date) => repo.list_attendance(date).await,
        Err(e) => Err(e),
    };
    Ok(listing(res, "Error al obtener asistencias"))
}

async fn create_attendance_handler(
    form: AttendanceForm,
    repo: SharedRepo,
) -> std::result::Result<Response, Infallible> {
    let res = match form.normalize() {
        Ok(attendance) => repo.create_attendance(&attendance).await,
        Err(e) => Err(e),
    };
    Ok(created(res, "Asistencia registrada", "attendanceId", "Error al registrar asistencia"))
}

async fn income_report_handler(range: DateRange, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    let res = match range.parse() {
        Ok((start, end)) => repo.income_report(start, end).await,
        Err(e) => Err(e),
    };
    Ok(listing(res, "Error al generar reporte de ingresos"))
}

async fn services_report_handler(range: DateRange, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    let res = match range.parse() {
        Ok((start, end)) => repo.services_report(start, end).await,
        Err(e) => Err(e),
    };
    Ok(listing(res, "Error al generar reporte de servicios"))
}

async fn list_campaigns_handler(repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.list_campaigns().await, "Error al obtener campañas"))
}

async fn create_campaign_handler(form: CampaignForm, repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    let res = match form.normalize() {
        Ok(campaign) => repo.create_campaign(&campaign).await,
        Err(e) => Err(e),
    };
    Ok(created(res, "Campaña creada", "campaignId", "Error al crear campaña"))
}

async fn audit_log_handler(repo: SharedRepo) -> std::result::Result<Response, Infallible> {
    Ok(listing(repo.audit_log().await, "Error al obtener bitácora"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, SqliteRepository};
    use crate::local::{LocalStore, MockRepository};
    use crate::models::{Client, IncomeReport};
    use bytes::Bytes;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::faker::phone_number::en::PhoneNumber;
    use fake::Fake;
    use serde_json::Value;

    fn mock_repo() -> SharedRepo {
        Arc::new(MockRepository::new(LocalStore::in_memory(), "Admin Principal"))
    }

    async fn sqlite_repo() -> anyhow::Result<SharedRepo> {
        let db = db::tests::setup_test_db().await?;
        Ok(Arc::new(SqliteRepository::new(db)))
    }

    fn fake_client() -> ClientForm {
        ClientForm {
            name: Name().fake(),
            email: Some(SafeEmail().fake()),
            phone: Some(PhoneNumber().fake()),
            address: None,
        }
    }

    fn body_json(body: &Bytes) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    async fn list_clients(repo: &SharedRepo) -> Vec<Client> {
        let res = warp::test::request()
            .method("GET")
            .path("/api/clientes")
            .reply(&get_clients(repo.clone()))
            .await;
        serde_json::from_slice(res.body()).unwrap()
    }

    async fn post_client_form(repo: &SharedRepo, form: &ClientForm) -> (StatusCode, Value) {
        let res = warp::test::request()
            .method("POST")
            .path("/api/clientes")
            .json(form)
            .reply(&post_client(repo.clone()))
            .await;
        (res.status(), body_json(res.body()))
    }

    #[tokio::test]
    async fn test_post_then_get_client() -> anyhow::Result<()> {
        let repo = sqlite_repo().await?;
        let form = fake_client();

        let (status, body) = post_client_form(&repo, &form).await;
        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Cliente creado exitosamente");

        let clients = list_clients(&repo).await;
        assert_eq!(clients.len(), 1);
        assert_eq!(Some(clients[0].id), body["clientId"].as_i64());
        assert_eq!(clients[0].name, form.name.trim());
        assert_eq!(clients[0].email, form.email);
        assert_eq!(clients[0].phone, form.phone);
        assert_eq!(clients[0].services, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_post_client_duplicate_email() -> anyhow::Result<()> {
        for repo in vec![mock_repo(), sqlite_repo().await?] {
            let mut form = fake_client();
            form.email = Some("ana@correo.cr".to_string());
            post_client_form(&repo, &form).await;

            let mut twin = fake_client();
            twin.email = form.email.clone();
            let (status, body) = post_client_form(&repo, &twin).await;

            assert_eq!(status, 400);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], db::EMAIL_TAKEN);
            assert_eq!(list_clients(&repo).await.len(), 1);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_post_client_without_name() -> anyhow::Result<()> {
        let repo = mock_repo();
        let mut form = fake_client();
        form.name = "   ".to_string();

        let (status, _) = post_client_form(&repo, &form).await;
        assert_eq!(status, 400);
        assert!(list_clients(&repo).await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_put_client_with_taken_email() -> anyhow::Result<()> {
        let repo = sqlite_repo().await?;

        let mut ana = fake_client();
        ana.email = Some("ana@correo.cr".to_string());
        let mut luis = fake_client();
        luis.email = Some("luis@correo.cr".to_string());
        post_client_form(&repo, &ana).await;
        let (_, body) = post_client_form(&repo, &luis).await;
        let luis_id = body["clientId"].as_i64().unwrap();

        let mut edit = luis.clone();
        edit.email = ana.email.clone();
        let res = warp::test::request()
            .method("PUT")
            .path(&format!("/api/clientes/{}", luis_id))
            .json(&edit)
            .reply(&put_client(repo.clone()))
            .await;

        assert_eq!(res.status(), 400);
        assert_eq!(body_json(res.body())["error"], db::EMAIL_TAKEN_OTHER);

        let clients = list_clients(&repo).await;
        let stored = clients.iter().find(|c| c.id == luis_id).unwrap();
        assert_eq!(stored.email.as_deref(), Some("luis@correo.cr"));

        Ok(())
    }

    #[tokio::test]
    async fn test_put_client_updates_fields() -> anyhow::Result<()> {
        let repo = mock_repo();
        let (_, body) = post_client_form(&repo, &fake_client()).await;
        let id = body["clientId"].as_i64().unwrap();

        let edit = ClientForm {
            name: "María José Vargas".to_string(),
            email: None,
            phone: Some("8888-1234".to_string()),
            address: Some("San José".to_string()),
        };
        let res = warp::test::request()
            .method("PUT")
            .path(&format!("/api/clientes/{}", id))
            .json(&edit)
            .reply(&put_client(repo.clone()))
            .await;

        assert_eq!(res.status(), 200);
        assert_eq!(body_json(res.body())["message"], "Cliente actualizado");

        let clients = list_clients(&repo).await;
        assert_eq!(clients[0].name, "María José Vargas");
        assert_eq!(clients[0].email, None);
        assert_eq!(clients[0].address.as_deref(), Some("San José"));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_client() -> anyhow::Result<()> {
        let repo = sqlite_repo().await?;
        let (_, body) = post_client_form(&repo, &fake_client()).await;
        let id = body["clientId"].as_i64().unwrap();

        let filter = delete_client(repo.clone());
        let res = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/clientes/{}", id))
            .reply(&filter)
            .await;

        assert_eq!(res.status(), 200);
        assert_eq!(body_json(res.body())["message"], "Cliente eliminado");
        assert!(list_clients(&repo).await.is_empty());

        let again = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/clientes/{}", id))
            .reply(&filter)
            .await;
        assert_eq!(again.status(), 404);

        Ok(())
    }

    async fn seed_invoice(repo: &SharedRepo) -> anyhow::Result<Value> {
        let client_id = repo.create_client(&fake_client().normalize()).await?;
        let corte = repo.create_service(&db::tests::new_service("Corte", 8000.0)).await?;
        let barba = repo.create_service(&db::tests::new_service("Barba", 6500.0)).await?;

        let payload = json!({
            "clientId": client_id,
            "services": [
                { "serviceId": corte, "name": "Corte", "price": 8000 },
                { "serviceId": barba, "name": "Barba", "price": 6500 },
            ],
            "paymentMethod": "sinpe",
        });

        let res = warp::test::request()
            .method("POST")
            .path("/api/facturas")
            .json(&payload)
            .reply(&post_invoice(repo.clone()))
            .await;
        assert_eq!(res.status(), 200);

        Ok(body_json(res.body()))
    }

    #[tokio::test]
    async fn test_post_invoice() -> anyhow::Result<()> {
        let repo = sqlite_repo().await?;

        let body = seed_invoice(&repo).await?;
        assert_eq!(body["message"], "Factura creada");
        assert_eq!(body["invoiceNumber"], "INV-000001");
        assert_eq!(body["total"], 14500.0);

        let res = warp::test::request()
            .method("GET")
            .path(&format!("/api/facturas/{}", body["invoiceId"]))
            .reply(&get_invoice(repo.clone()))
            .await;
        assert_eq!(res.status(), 200);

        let detail = body_json(res.body());
        assert_eq!(detail["lines"].as_array().map(Vec::len), Some(2));
        assert_eq!(detail["payment"]["amount"], 14500.0);
        assert_eq!(detail["payment"]["method"], "sinpe");
        assert_eq!(detail["status"], "Paid");

        Ok(())
    }

    #[tokio::test]
    async fn test_post_invoice_without_services() -> anyhow::Result<()> {
        let repo = mock_repo();
        let client_id = repo.create_client(&fake_client().normalize()).await?;

        let res = warp::test::request()
            .method("POST")
            .path("/api/facturas")
            .json(&json!({ "clientId": client_id, "services": [], "paymentMethod": "cash" }))
            .reply(&post_invoice(repo.clone()))
            .await;

        assert_eq!(res.status(), 400);
        assert!(repo.list_invoices().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_invoice_is_not_found() -> anyhow::Result<()> {
        let repo = sqlite_repo().await?;

        let res = warp::test::request()
            .method("GET")
            .path("/api/facturas/99")
            .reply(&get_invoice(repo))
            .await;
        assert_eq!(res.status(), 404);

        Ok(())
    }

    #[tokio::test]
    async fn test_income_report_route() -> anyhow::Result<()> {
        for repo in vec![mock_repo(), sqlite_repo().await?] {
            seed_invoice(&repo).await?;
            let today = Local::now().date_naive();

            let res = warp::test::request()
                .method("GET")
                .path(&format!(
                    "/api/reportes/ingresos?startDate={}&endDate={}",
                    today, today
                ))
                .reply(&get_income_report(repo.clone()))
                .await;
            assert_eq!(res.status(), 200);

            let report: IncomeReport = serde_json::from_slice(res.body())?;
            assert_eq!(report.total_facturas, 1);
            assert_eq!(report.total_ingresos, 14500.0);

            let res = warp::test::request()
                .method("GET")
                .path("/api/reportes/ingresos?startDate=2024-01-01&endDate=2024-01-31")
                .reply(&get_income_report(repo.clone()))
                .await;
            let report: IncomeReport = serde_json::from_slice(res.body())?;
            assert_eq!(report.total_facturas, 0);
            assert_eq!(report.promedio_factura, 0.0);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_report_with_bad_dates() -> anyhow::Result<()> {
        let repo = mock_repo();

        let res = warp::test::request()
            .method("GET")
            .path("/api/reportes/servicios?startDate=enero&endDate=2024-01-31")
            .reply(&get_services_report(repo))
            .await;
        assert_eq!(res.status(), 400);

        Ok(())
    }

    #[tokio::test]
    async fn test_appointment_routes() -> anyhow::Result<()> {
        let repo = mock_repo();
        let client_id = repo.create_client(&fake_client().normalize()).await?;

        let res = warp::test::request()
            .method("POST")
            .path("/api/citas")
            .json(&json!({ "clientId": client_id, "date": "2024-03-10", "time": "09:30", "duration": 45 }))
            .reply(&post_appointment(repo.clone()))
            .await;
        assert_eq!(res.status(), 200);
        let id = body_json(res.body())["appointmentId"].as_i64().unwrap();

        let res = warp::test::request()
            .method("PUT")
            .path(&format!("/api/citas/{}/status", id))
            .json(&json!({ "status": "Completed" }))
            .reply(&put_appointment_status(repo.clone()))
            .await;
        assert_eq!(res.status(), 200);

        let res = warp::test::request()
            .method("GET")
            .path("/api/citas")
            .reply(&get_appointments(repo.clone()))
            .await;
        let appointments = body_json(res.body());
        assert_eq!(appointments[0]["scheduledStart"], "2024-03-10 09:30:00");
        assert_eq!(appointments[0]["scheduledEnd"], "2024-03-10 10:15:00");
        assert_eq!(appointments[0]["status"], "Completed");

        let res = warp::test::request()
            .method("POST")
            .path("/api/citas")
            .json(&json!({ "clientId": client_id, "date": "10/03/2024", "time": "09:30", "duration": 45 }))
            .reply(&post_appointment(repo.clone()))
            .await;
        assert_eq!(res.status(), 400);

        Ok(())
    }

    #[tokio::test]
    async fn test_appointment_with_huge_duration() -> anyhow::Result<()> {
        let repo = mock_repo();
        let client_id = repo.create_client(&fake_client().normalize()).await?;

        let res = warp::test::request()
            .method("POST")
            .path("/api/citas")
            .json(&json!({
                "clientId": client_id,
                "date": "2024-03-10",
                "time": "09:30",
                "duration": 9_000_000_000_000_i64,
            }))
            .reply(&post_appointment(repo.clone()))
            .await;
        assert_eq!(res.status(), 400);
        assert_eq!(body_json(res.body())["success"], false);
        assert!(repo.list_appointments().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_invoice_for_missing_client_on_both_stores() -> anyhow::Result<()> {
        for repo in vec![mock_repo(), sqlite_repo().await?] {
            let corte = repo.create_service(&db::tests::new_service("Corte", 8000.0)).await?;

            let res = warp::test::request()
                .method("POST")
                .path("/api/facturas")
                .json(&json!({
                    "clientId": 4242,
                    "services": [{ "serviceId": corte, "name": "Corte", "price": 8000 }],
                    "paymentMethod": "cash",
                }))
                .reply(&post_invoice(repo.clone()))
                .await;
            assert_eq!(res.status(), 404);
            assert!(repo.list_invoices().await?.is_empty());
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_user_routes() -> anyhow::Result<()> {
        for repo in vec![mock_repo(), sqlite_repo().await?] {
            let email: String = SafeEmail().fake();
            let form = json!({ "name": "Marta Rojas", "email": email, "role": "Recepción" });

            let res = warp::test::request()
                .method("POST")
                .path("/api/usuarios")
                .json(&form)
                .reply(&post_user(repo.clone()))
                .await;
            assert_eq!(res.status(), 200);
            let body = body_json(res.body());
            assert_eq!(body["message"], "Usuario creado exitosamente");
            let id = body["userId"].as_i64();

            let res = warp::test::request()
                .method("POST")
                .path("/api/usuarios")
                .json(&form)
                .reply(&post_user(repo.clone()))
                .await;
            assert_eq!(res.status(), 400);
            assert_eq!(body_json(res.body())["error"], "El correo ya está registrado");

            let res = warp::test::request()
                .method("GET")
                .path("/api/usuarios")
                .reply(&get_users(repo.clone()))
                .await;
            let users = body_json(res.body());
            assert_eq!(users.as_array().map(Vec::len), Some(1));
            assert_eq!(users[0]["id"].as_i64(), id);
            assert_eq!(users[0]["status"], "activo");
            assert_eq!(users[0]["permissions"], json!([]));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_gets_are_identical() -> anyhow::Result<()> {
        let repo = sqlite_repo().await?;
        seed_invoice(&repo).await?;

        for path in ["/api/clientes", "/api/facturas", "/api/servicios"] {
            let filter = api(repo.clone());
            let first = warp::test::request().method("GET").path(path).reply(&filter).await;
            let second = warp::test::request().method("GET").path(path).reply(&filter).await;

            assert_eq!(first.status(), 200);
            assert_eq!(first.body(), second.body());
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_audit_log_route() -> anyhow::Result<()> {
        let repo = mock_repo();
        post_client_form(&repo, &fake_client()).await;

        let res = warp::test::request()
            .method("GET")
            .path("/api/bitacora")
            .reply(&get_audit_log(repo))
            .await;
        let log = body_json(res.body());
        assert_eq!(log[0]["action"], "Crear cliente");
        assert_eq!(log[0]["actor"], "Admin Principal");

        let res = warp::test::request()
            .method("GET")
            .path("/api/bitacora")
            .reply(&get_audit_log(sqlite_repo().await?))
            .await;
        assert_eq!(res.body(), "[]");

        Ok(())
    }

    #[tokio::test]
    async fn test_routes_serve_index() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("barberia_public_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("index.html"), "<h1>Black White Barbería</h1>").await?;

        let filter = routes(mock_repo(), dir.clone());

        let res = warp::test::request().method("GET").path("/").reply(&filter).await;
        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), "<h1>Black White Barbería</h1>");

        let res = warp::test::request().method("GET").path("/api/staff").reply(&filter).await;
        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), "[]");

        Ok(())
    }
}
