//! Screen logic for the admin front end, kept free of any I/O.
//!
//! Table models are regenerated in full from the [`crate::client::Store`] on
//! every render. The [`Navigator`] decides which single view is on screen.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::Credentials;
use crate::models::{
    Appointment, Attendance, AuditEntry, Campaign, Client, ClientForm, IncomeReport, Invoice,
    InvoiceForm, NewService, Service, ServiceSales, Staff, User, UserForm,
};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Rows shown by the audit table.
pub const AUDIT_ROWS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    /// Shown instead of the rows when there are none.
    pub empty_message: &'static str,
}

impl Table {
    fn new(headers: Vec<&'static str>, empty_message: &'static str) -> Self {
        Table {
            headers,
            rows: Vec::new(),
            empty_message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn or_na(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "N/A".to_string())
}

pub fn money(amount: f64) -> String {
    format!("₡{:.2}", amount)
}

pub fn clients_table(clients: &[Client]) -> Table {
    let mut table = Table::new(
        vec!["ID", "Nombre", "Email", "Teléfono", "Servicios"],
        "No hay clientes registrados",
    );
    table.rows = clients
        .iter()
        .map(|c| {
            vec![
                format!("#{}", c.id),
                c.name.clone(),
                or_na(&c.email),
                or_na(&c.phone),
                c.services.to_string(),
            ]
        })
        .collect();
    table
}

pub fn services_table(services: &[Service]) -> Table {
    let mut table = Table::new(
        vec!["ID", "Servicio", "Duración", "Precio"],
        "No hay servicios registrados",
    );
    table.rows = services
        .iter()
        .map(|s| {
            vec![
                format!("#{}", s.id),
                s.name.clone(),
                format!("{} min", s.duration),
                money(s.price),
            ]
        })
        .collect();
    table
}

pub fn staff_table(staff: &[Staff]) -> Table {
    let mut table = Table::new(vec!["ID", "Nombre", "Rol"], "No hay personal registrado");
    table.rows = staff
        .iter()
        .map(|s| vec![format!("#{}", s.id), s.name.clone(), s.role.clone()])
        .collect();
    table
}

pub fn users_table(users: &[User]) -> Table {
    let mut table = Table::new(vec!["Nombre", "Rol", "Estado"], "No hay usuarios registrados");
    table.rows = users
        .iter()
        .map(|u| {
            let status = if u.is_active() { "ACTIVO" } else { "INACTIVO" };
            vec![u.name.clone(), u.role.clone(), status.to_string()]
        })
        .collect();
    table
}

/// `(id, "name - role")` pairs for the permissions picker.
pub fn user_options(users: &[User]) -> Vec<(i64, String)> {
    users
        .iter()
        .map(|u| (u.id, format!("{} - {}", u.name, u.role)))
        .collect()
}

pub fn user_details(user: &User) -> String {
    let permissions = if user.permissions.is_empty() {
        "Ninguno".to_string()
    } else {
        user.permissions.join(", ")
    };
    format!(
        "Usuario: {}\nRol: {}\nEstado: {}\nPermisos: {}",
        user.name, user.role, user.status, permissions
    )
}

pub fn appointments_table(appointments: &[Appointment]) -> Table {
    let mut table = Table::new(
        vec!["ID", "Cliente", "Barbero", "Inicio", "Fin", "Estado"],
        "No hay citas programadas",
    );
    table.rows = appointments
        .iter()
        .map(|a| {
            vec![
                format!("#{}", a.id),
                a.client_name.clone(),
                or_na(&a.staff_name),
                a.scheduled_start.clone(),
                a.scheduled_end.clone(),
                a.status.clone(),
            ]
        })
        .collect();
    table
}

pub fn invoices_table(invoices: &[Invoice]) -> Table {
    let mut table = Table::new(
        vec!["Número", "Fecha", "Cliente", "Total", "Estado"],
        "No hay facturas registradas",
    );
    table.rows = invoices
        .iter()
        .map(|i| {
            vec![
                i.invoice_number.clone(),
                i.issued_at.clone(),
                i.client_name.clone(),
                money(i.total),
                i.status.clone(),
            ]
        })
        .collect();
    table
}

pub fn attendance_table(attendance: &[Attendance]) -> Table {
    let mut table = Table::new(
        vec!["Empleado", "Fecha", "Entrada", "Salida", "Descanso"],
        "No hay asistencias registradas",
    );
    table.rows = attendance
        .iter()
        .map(|a| {
            vec![
                a.employee_name.clone(),
                a.date.clone(),
                a.check_in.clone(),
                or_na(&a.check_out),
                format!("{} min", a.break_minutes),
            ]
        })
        .collect();
    table
}

pub fn campaigns_table(campaigns: &[Campaign]) -> Table {
    let mut table = Table::new(
        vec!["Campaña", "Canal", "Inicio", "Fin", "Presupuesto"],
        "No hay campañas registradas",
    );
    table.rows = campaigns
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.channel.clone(),
                c.start_date.clone(),
                c.end_date.clone(),
                money(c.budget),
            ]
        })
        .collect();
    table
}

/// Only the [`AUDIT_ROWS`] newest entries; `entries` is expected newest first.
pub fn audit_table(entries: &[AuditEntry]) -> Table {
    let mut table = Table::new(
        vec!["Fecha", "Usuario", "Acción", "Detalle"],
        "No hay eventos registrados",
    );
    table.rows = entries
        .iter()
        .take(AUDIT_ROWS)
        .map(|e| {
            vec![
                e.timestamp.clone(),
                e.actor.clone(),
                e.action.clone(),
                e.detail.clone(),
            ]
        })
        .collect();
    table
}

pub fn sales_table(sales: &[ServiceSales]) -> Table {
    let mut table = Table::new(
        vec!["Servicio", "Cantidad", "Total"],
        "No hay datos suficientes para generar el reporte",
    );
    table.rows = sales
        .iter()
        .map(|s| vec![s.servicio.clone(), s.cantidad.to_string(), money(s.total_ventas)])
        .collect();
    table
}

pub fn income_table(report: &IncomeReport) -> Table {
    let mut table = Table::new(vec!["Facturas", "Ingresos", "Promedio"], "");
    table.rows = vec![vec![
        report.total_facturas.to_string(),
        money(report.total_ingresos),
        money(report.promedio_factura),
    ]];
    table
}

/// Case-insensitive match on name or email, plain substring on phone.
/// A blank query matches nothing.
pub fn search_clients<'a>(clients: &'a [Client], query: &str) -> Vec<&'a Client> {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }

    clients
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&term)
                || c.email
                    .as_ref()
                    .map_or(false, |e| e.to_lowercase().contains(&term))
                || c.phone.as_ref().map_or(false, |p| p.contains(&term))
        })
        .collect()
}

/// `(id, "name - email")` pairs for client pickers.
pub fn client_options(clients: &[Client]) -> Vec<(i64, String)> {
    clients
        .iter()
        .map(|c| {
            let label = match &c.email {
                Some(email) => format!("{} - {}", c.name, email),
                None => c.name.clone(),
            };
            (c.id, label)
        })
        .collect()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

pub fn validate_client(form: &ClientForm) -> Result<(), String> {
    if form.name.trim().is_empty() {
        return Err("El nombre es obligatorio".to_string());
    }
    match form.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() && !is_valid_email(email) => {
            Err("Correo electrónico inválido".to_string())
        }
        _ => Ok(()),
    }
}

pub fn validate_user(form: &UserForm) -> Result<(), String> {
    if form.name.trim().is_empty() || form.role.trim().is_empty() {
        return Err("Nombre y rol son obligatorios".to_string());
    }
    if !is_valid_email(&form.email) {
        return Err("Correo electrónico inválido".to_string());
    }
    Ok(())
}

pub fn validate_service(service: &NewService) -> Result<(), String> {
    if service.name.trim().is_empty() {
        return Err("El nombre del servicio es obligatorio".to_string());
    }
    if service.duration <= 0 {
        return Err("La duración debe ser mayor a cero".to_string());
    }
    Ok(())
}

pub fn validate_invoice(form: &InvoiceForm) -> Result<(), String> {
    if form.services.is_empty() {
        return Err("Agregue al menos un servicio".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notification {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notification {
            kind: NotificationKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notification {
            kind: NotificationKind::Warning,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Menu,
    Clientes,
    Administrativo,
    Citas,
    Facturacion,
    Reportes,
    Marketing,
    Servicios,
    Asistencias,
}

impl View {
    pub const ALL: [View; 10] = [
        View::Login,
        View::Menu,
        View::Clientes,
        View::Administrativo,
        View::Citas,
        View::Facturacion,
        View::Reportes,
        View::Marketing,
        View::Servicios,
        View::Asistencias,
    ];

    /// Menu module for `name`, if it is one the app ships.
    pub fn module(name: &str) -> Option<View> {
        match name {
            "clientes" => Some(View::Clientes),
            "administrativo" => Some(View::Administrativo),
            "citas" => Some(View::Citas),
            "facturacion" => Some(View::Facturacion),
            "reportes" => Some(View::Reportes),
            "marketing" => Some(View::Marketing),
            "servicios" => Some(View::Servicios),
            "asistencias" => Some(View::Asistencias),
            _ => None,
        }
    }
}

/// Which view is on screen, plus the notifications raised getting there.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: View,
    credentials: Credentials,
    notifications: Vec<Notification>,
}

impl Navigator {
    pub fn new(credentials: Credentials) -> Self {
        Navigator {
            current: View::Login,
            credentials,
            notifications: Vec::new(),
        }
    }

    pub fn current(&self) -> View {
        self.current
    }

    pub fn is_visible(&self, view: View) -> bool {
        self.current == view
    }

    /// Drains pending notifications.
    pub fn notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Only a UI gate; the API itself is not protected.
    pub fn login(&mut self, email: &str, password: &str) -> bool {
        if email == self.credentials.email && password == self.credentials.password {
            self.notifications
                .push(Notification::success("¡Bienvenido al sistema!"));
            self.current = View::Menu;
            true
        } else {
            self.notifications
                .push(Notification::error("Credenciales incorrectas"));
            false
        }
    }

    pub fn open_module(&mut self, name: &str) -> View {
        if self.current == View::Login {
            self.notifications
                .push(Notification::warning("Inicie sesión para continuar"));
            return self.current;
        }

        match View::module(name) {
            Some(view) => self.current = view,
            None => {
                self.notifications
                    .push(Notification::info(format!("Módulo de {} en desarrollo", name)));
                self.current = View::Menu;
            }
        }
        self.current
    }

    pub fn back_to_menu(&mut self) {
        if self.current != View::Login {
            self.current = View::Menu;
        }
    }

    pub fn logout(&mut self) {
        self.notifications.push(Notification::info("Cerrando sesión..."));
        self.current = View::Login;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceLineForm, PaymentMethod};

    fn client(id: i64, name: &str, email: Option<&str>, phone: Option<&str>) -> Client {
        Client {
            id,
            name: name.to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            address: None,
            services: 0,
        }
    }

    fn navigator() -> Navigator {
        Navigator::new(Credentials {
            email: "admin@barberia.com".to_string(),
            password: "admin123".to_string(),
        })
    }

    fn visible(nav: &Navigator) -> Vec<View> {
        View::ALL.iter().copied().filter(|v| nav.is_visible(*v)).collect()
    }

    fn user(id: i64, name: &str, role: &str, status: &str, permissions: &[&str]) -> User {
        User {
            id,
            name: name.to_string(),
            email: format!("{}@barberia.com", id),
            role: role.to_string(),
            status: status.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_users_table_and_options() {
        let users = vec![
            user(1, "Marta Rojas", "Recepción", "activo", &[]),
            user(2, "Pablo Vega", "Administrador", "inactivo", &["reportes", "facturacion"]),
        ];

        let table = users_table(&users);
        assert_eq!(table.rows[0], vec!["Marta Rojas", "Recepción", "ACTIVO"]);
        assert_eq!(table.rows[1][2], "INACTIVO");
        assert_eq!(users_table(&[]).empty_message, "No hay usuarios registrados");

        assert_eq!(
            user_options(&users),
            vec![
                (1, "Marta Rojas - Recepción".to_string()),
                (2, "Pablo Vega - Administrador".to_string()),
            ]
        );

        assert_eq!(
            user_details(&users[0]),
            "Usuario: Marta Rojas\nRol: Recepción\nEstado: activo\nPermisos: Ninguno"
        );
        assert!(user_details(&users[1]).ends_with("Permisos: reportes, facturacion"));
    }

    #[test]
    fn test_validate_user() {
        let form = UserForm {
            name: "Marta Rojas".to_string(),
            email: "marta@barberia.com".to_string(),
            role: "Recepción".to_string(),
        };
        assert!(validate_user(&form).is_ok());

        let bad_email = UserForm {
            email: "marta".to_string(),
            ..form.clone()
        };
        assert_eq!(validate_user(&bad_email), Err("Correo electrónico inválido".to_string()));

        let no_role = UserForm {
            role: String::new(),
            ..form
        };
        assert!(validate_user(&no_role).is_err());
    }

    #[test]
    fn test_clients_table_fills_missing_fields() {
        let table = clients_table(&[client(3, "Ana Solano", None, Some("8888-1234"))]);

        assert_eq!(table.headers.len(), table.rows[0].len());
        assert_eq!(table.rows[0], vec!["#3", "Ana Solano", "N/A", "8888-1234", "0"]);
        assert!(clients_table(&[]).is_empty());
    }

    #[test]
    fn test_audit_table_shows_ten_newest() {
        let entries: Vec<AuditEntry> = (0..15)
            .map(|i| AuditEntry {
                id: i,
                actor: "Admin Principal".to_string(),
                action: "Crear cliente".to_string(),
                detail: format!("evento {}", i),
                timestamp: "2024-01-15 10:00:00".to_string(),
            })
            .collect();

        let table = audit_table(&entries);
        assert_eq!(table.rows.len(), AUDIT_ROWS);
        assert_eq!(table.rows[0][3], "evento 0");
    }

    #[test]
    fn test_search_clients() {
        let clients = vec![
            client(1, "Ana Solano", Some("ana@correo.cr"), Some("8888-1234")),
            client(2, "Luis Mora", Some("LUIS@Correo.cr"), None),
            client(3, "Carlos Jiménez", None, Some("7000-5555")),
        ];

        let ids = |q: &str| -> Vec<i64> { search_clients(&clients, q).iter().map(|c| c.id).collect() };

        assert_eq!(ids("ana"), vec![1]);
        assert_eq!(ids("correo"), vec![1, 2]);
        assert_eq!(ids("5555"), vec![3]);
        assert_eq!(ids("MORA"), vec![2]);
        assert!(ids("   ").is_empty());
    }

    #[test]
    fn test_client_options() {
        let options = client_options(&[
            client(1, "Ana Solano", Some("ana@correo.cr"), None),
            client(2, "Luis Mora", None, None),
        ]);

        assert_eq!(options[0], (1, "Ana Solano - ana@correo.cr".to_string()));
        assert_eq!(options[1], (2, "Luis Mora".to_string()));
    }

    #[test]
    fn test_validation_rules() {
        let mut form = ClientForm {
            name: "Ana".to_string(),
            email: Some("ana@correo".to_string()),
            ..ClientForm::default()
        };
        assert!(validate_client(&form).is_err());

        form.email = Some("ana@correo.cr".to_string());
        assert!(validate_client(&form).is_ok());

        form.email = Some(" ".to_string());
        assert!(validate_client(&form).is_ok());

        form.name = String::new();
        assert!(validate_client(&form).is_err());

        let service = NewService {
            name: "Corte".to_string(),
            description: None,
            duration: 0,
            price: 8000.0,
        };
        assert!(validate_service(&service).is_err());

        let mut invoice = InvoiceForm {
            client_id: 7,
            appointment_id: None,
            services: Vec::new(),
            tax: None,
            tip: None,
            payment_method: PaymentMethod::Cash,
        };
        assert!(validate_invoice(&invoice).is_err());

        invoice.services.push(InvoiceLineForm {
            service_id: 1,
            name: "Corte".to_string(),
            price: 8000.0,
            quantity: None,
        });
        assert!(validate_invoice(&invoice).is_ok());
    }

    #[test]
    fn test_login_gate() {
        let mut nav = navigator();
        assert_eq!(visible(&nav), vec![View::Login]);

        assert!(!nav.login("admin@barberia.com", "wrong"));
        assert_eq!(nav.current(), View::Login);
        assert_eq!(nav.notifications()[0].kind, NotificationKind::Error);

        assert_eq!(nav.open_module("clientes"), View::Login);

        assert!(nav.login("admin@barberia.com", "admin123"));
        assert_eq!(visible(&nav), vec![View::Menu]);
    }

    #[test]
    fn test_navigation_shows_one_view() {
        let mut nav = navigator();
        nav.login("admin@barberia.com", "admin123");

        for name in ["clientes", "facturacion", "asistencias"] {
            let view = nav.open_module(name);
            assert_eq!(visible(&nav), vec![view]);
            nav.back_to_menu();
            assert_eq!(visible(&nav), vec![View::Menu]);
        }

        nav.logout();
        assert_eq!(visible(&nav), vec![View::Login]);
    }

    #[test]
    fn test_unknown_module_stays_on_menu() {
        let mut nav = navigator();
        nav.login("admin@barberia.com", "admin123");
        nav.notifications();

        assert_eq!(nav.open_module("inventario"), View::Menu);
        assert_eq!(
            nav.notifications(),
            vec![Notification::info("Módulo de inventario en desarrollo")]
        );
    }
}
