use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use prettytable::{color, row, Attr, Cell, Row, Table};

use barberia::client::{ApiClient, Store};
use barberia::config::Credentials;
use barberia::models::{
    AppointmentForm, AttendanceForm, CampaignForm, ClientForm, DateRange, InvoiceForm,
    InvoiceLineForm, NewService, PaymentMethod, StaffForm, UserForm, DATE_FORMAT,
};
use barberia::telemetry::{get_subscriber, init_subscriber};
use barberia::view::{self, Navigator, Notification, NotificationKind, View};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = get_subscriber("barberia".into(), "warn".into(), std::io::stderr);
    init_subscriber(subscriber)?;

    let matches = cli().get_matches();

    let mut nav = Navigator::new(Credentials::from_env()?);
    let email = arg::<String>(&matches, "email")?;
    let password = arg::<String>(&matches, "password")?;
    if !nav.login(&email, &password) {
        notify(&mut nav);
        std::process::exit(1);
    }
    nav.notifications();

    let api = ApiClient::from_env()?;
    let mut store = Store::default();

    let res = match matches.subcommand() {
        Some(("modulo", m)) => open_module(&mut nav, &api, &mut store, &arg::<String>(m, "name")?).await,
        Some(("clientes", m)) => clients(&api, &mut store, m).await,
        Some(("servicios", m)) => services(&api, &mut store, m).await,
        Some(("staff", m)) => staff(&api, &mut store, m).await,
        Some(("usuarios", m)) => users(&api, &mut store, m).await,
        Some(("citas", m)) => appointments(&api, &mut store, m).await,
        Some(("facturas", m)) => invoices(&api, &mut store, m).await,
        Some(("asistencias", m)) => attendance(&api, &mut store, m).await,
        Some(("reportes", m)) => {
            let range = DateRange {
                start_date: arg(m, "start")?,
                end_date: arg(m, "end")?,
            };
            reports(&api, &mut store, &range).await
        }
        Some(("campanas", m)) => campaigns(&api, &mut store, m).await,
        Some(("bitacora", _)) => {
            store.refresh_audit(&api).await;
            print_table(&view::audit_table(&store.audit));
            Ok(())
        }
        _ => Ok(()),
    };

    if let Err(e) = res {
        print_notification(&Notification::error(e.to_string()));
        std::process::exit(1);
    }

    Ok(())
}

fn cli() -> Command {
    let id = || Arg::new("id").required(true).value_parser(value_parser!(i64));
    let list = || Command::new("list").about("Show the table.");

    Command::new("barberia")
        .version(crate_version!())
        .about("Back office for Black White Barbería.")
        .subcommand_required(true)
        .arg(
            Arg::new("email")
                .long("email")
                .global(true)
                .default_value("admin@barberia.com")
                .help("Admin login email."),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .global(true)
                .default_value("")
                .help("Admin login password."),
        )
        .subcommand(
            Command::new("modulo")
                .about("Open a menu module and show its screens.")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("clientes")
                .about("Manage clients.")
                .subcommand_required(true)
                .subcommand(list())
                .subcommand(client_args(Command::new("add").about("Register a client.")))
                .subcommand(client_args(Command::new("edit").about("Edit a client.").arg(id())))
                .subcommand(Command::new("delete").about("Delete a client.").arg(id()))
                .subcommand(
                    Command::new("search")
                        .about("Search by name, email or phone.")
                        .arg(Arg::new("query").required(true)),
                ),
        )
        .subcommand(
            Command::new("servicios")
                .about("Manage the service catalog.")
                .subcommand_required(true)
                .subcommand(list())
                .subcommand(service_args(Command::new("add").about("Add a service.")))
                .subcommand(service_args(Command::new("edit").about("Edit a service.").arg(id())))
                .subcommand(Command::new("delete").about("Delete a service.").arg(id())),
        )
        .subcommand(
            Command::new("staff")
                .about("Manage staff.")
                .subcommand_required(true)
                .subcommand(list())
                .subcommand(
                    Command::new("add")
                        .about("Add a staff member.")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("role").required(true)),
                ),
        )
        .subcommand(
            Command::new("usuarios")
                .about("Manage admin users.")
                .subcommand_required(true)
                .subcommand(list())
                .subcommand(Command::new("show").about("Show a user's details.").arg(id()))
                .subcommand(
                    Command::new("add")
                        .about("Create an admin user.")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("user_email").required(true))
                        .arg(Arg::new("role").required(true)),
                ),
        )
        .subcommand(
            Command::new("citas")
                .about("Manage appointments.")
                .subcommand_required(true)
                .subcommand(list())
                .subcommand(
                    Command::new("add")
                        .about("Book an appointment.")
                        .arg(Arg::new("client").required(true).value_parser(value_parser!(i64)))
                        .arg(Arg::new("date").required(true).help("YYYY-MM-DD"))
                        .arg(Arg::new("time").required(true).help("HH:MM"))
                        .arg(
                            Arg::new("duration")
                                .required(true)
                                .value_parser(value_parser!(i64))
                                .help("Minutes."),
                        )
                        .arg(Arg::new("staff").long("staff").value_parser(value_parser!(i64)))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(
                    Command::new("status")
                        .about("Change an appointment's status.")
                        .arg(id())
                        .arg(Arg::new("status").required(true)),
                ),
        )
        .subcommand(
            Command::new("facturas")
                .about("Invoicing.")
                .subcommand_required(true)
                .subcommand(list())
                .subcommand(Command::new("show").about("Show one invoice.").arg(id()))
                .subcommand(
                    Command::new("add")
                        .about("Invoice a client.")
                        .arg(Arg::new("client").required(true).value_parser(value_parser!(i64)))
                        .arg(
                            Arg::new("service")
                                .long("service")
                                .short('s')
                                .required(true)
                                .action(ArgAction::Append)
                                .help("Service id, optionally followed by :quantity."),
                        )
                        .arg(Arg::new("tax").long("tax").value_parser(value_parser!(f64)))
                        .arg(Arg::new("tip").long("tip").value_parser(value_parser!(f64)))
                        .arg(Arg::new("appointment").long("appointment").value_parser(value_parser!(i64)))
                        .arg(
                            Arg::new("method")
                                .long("method")
                                .default_value("cash")
                                .value_parser(["cash", "card", "sinpe", "transfer"]),
                        ),
                ),
        )
        .subcommand(
            Command::new("asistencias")
                .about("Staff attendance.")
                .subcommand_required(true)
                .subcommand(list().arg(Arg::new("date").long("date").help("YYYY-MM-DD")))
                .subcommand(
                    Command::new("add")
                        .about("Register a check-in.")
                        .arg(Arg::new("staff").required(true).value_parser(value_parser!(i64)))
                        .arg(Arg::new("date").required(true))
                        .arg(Arg::new("check_in").required(true))
                        .arg(Arg::new("check_out").long("check-out"))
                        .arg(Arg::new("break").long("break").value_parser(value_parser!(i64))),
                ),
        )
        .subcommand(
            Command::new("reportes")
                .about("Income and sales per service for a date window.")
                .arg(Arg::new("start").required(true))
                .arg(Arg::new("end").required(true)),
        )
        .subcommand(
            Command::new("campanas")
                .about("Marketing campaigns.")
                .subcommand_required(true)
                .subcommand(list())
                .subcommand(
                    Command::new("add")
                        .about("Create a campaign.")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("channel").required(true))
                        .arg(Arg::new("start").required(true))
                        .arg(Arg::new("end").required(true))
                        .arg(Arg::new("budget").required(true).value_parser(value_parser!(f64))),
                ),
        )
        .subcommand(Command::new("bitacora").about("Show the latest audit log entries."))
}

fn client_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("name").required(true))
        .arg(Arg::new("client_email").long("client-email"))
        .arg(Arg::new("phone").long("phone"))
        .arg(Arg::new("address").long("address"))
}

fn service_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("name").required(true))
        .arg(Arg::new("duration").required(true).value_parser(value_parser!(i64)))
        .arg(Arg::new("price").required(true).value_parser(value_parser!(f64)))
        .arg(Arg::new("description").long("description"))
}

fn arg<T: Clone + Send + Sync + 'static>(m: &ArgMatches, name: &str) -> Result<T> {
    m.get_one::<T>(name)
        .cloned()
        .ok_or_else(|| anyhow!("missing argument '{}'", name))
}

fn opt<T: Clone + Send + Sync + 'static>(m: &ArgMatches, name: &str) -> Option<T> {
    m.get_one::<T>(name).cloned()
}

async fn open_module(nav: &mut Navigator, api: &ApiClient, store: &mut Store, name: &str) -> Result<()> {
    let view = nav.open_module(name);
    notify(nav);

    let today = Local::now().format(DATE_FORMAT).to_string();
    match view {
        View::Clientes => {
            store.refresh_clients(api).await;
            print_table(&view::clients_table(&store.clients));
        }
        View::Administrativo => {
            store.refresh_users(api).await;
            store.refresh_audit(api).await;
            print_table(&view::users_table(&store.users));
            for (id, label) in view::user_options(&store.users) {
                println!("  {:>4}  {}", id, label);
            }
            print_table(&view::audit_table(&store.audit));
        }
        View::Citas => {
            store.refresh_appointments(api).await;
            store.refresh_clients(api).await;
            print_table(&view::appointments_table(&store.appointments));
            for (id, label) in view::client_options(&store.clients) {
                println!("  {:>4}  {}", id, label);
            }
        }
        View::Facturacion => {
            store.refresh_invoices(api).await;
            print_table(&view::invoices_table(&store.invoices));
        }
        View::Reportes => {
            let range = DateRange {
                start_date: today.clone(),
                end_date: today,
            };
            reports(api, store, &range).await?;
        }
        View::Marketing => {
            store.refresh_campaigns(api).await;
            print_table(&view::campaigns_table(&store.campaigns));
        }
        View::Servicios => {
            store.refresh_services(api).await;
            store.refresh_staff(api).await;
            print_table(&view::services_table(&store.services));
            print_table(&view::staff_table(&store.staff));
        }
        View::Asistencias => {
            store.refresh_attendance(api, Some(&today)).await;
            print_table(&view::attendance_table(&store.attendance));
        }
        View::Login | View::Menu => {}
    }

    Ok(())
}

fn client_form(m: &ArgMatches) -> Result<ClientForm> {
    let form = ClientForm {
        name: arg(m, "name")?,
        email: opt(m, "client_email"),
        phone: opt(m, "phone"),
        address: opt(m, "address"),
    };
    view::validate_client(&form).map_err(|e| anyhow!(e))?;
    Ok(form)
}

async fn clients(api: &ApiClient, store: &mut Store, m: &ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", m)) => {
            let id = api.create_client(&client_form(m)?).await?;
            print_notification(&Notification::success(format!("Cliente #{} registrado exitosamente", id)));
        }
        Some(("edit", m)) => {
            api.update_client(arg(m, "id")?, &client_form(m)?).await?;
            print_notification(&Notification::success("Cliente actualizado exitosamente"));
        }
        Some(("delete", m)) => {
            api.delete_client(arg(m, "id")?).await?;
            print_notification(&Notification::success("Cliente eliminado correctamente"));
        }
        Some(("search", m)) => {
            store.refresh_clients(api).await;
            let found: Vec<_> = view::search_clients(&store.clients, &arg::<String>(m, "query")?)
                .into_iter()
                .cloned()
                .collect();
            if found.is_empty() {
                print_notification(&Notification::info("No se encontraron clientes"));
            } else {
                print_table(&view::clients_table(&found));
            }
            return Ok(());
        }
        _ => {}
    }

    store.refresh_clients(api).await;
    print_table(&view::clients_table(&store.clients));
    Ok(())
}

fn service_form(m: &ArgMatches) -> Result<NewService> {
    let service = NewService {
        name: arg(m, "name")?,
        description: opt(m, "description"),
        duration: arg(m, "duration")?,
        price: arg(m, "price")?,
    };
    view::validate_service(&service).map_err(|e| anyhow!(e))?;
    Ok(service)
}

async fn services(api: &ApiClient, store: &mut Store, m: &ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", m)) => {
            api.create_service(&service_form(m)?).await?;
            print_notification(&Notification::success("Servicio creado"));
        }
        Some(("edit", m)) => {
            api.update_service(arg(m, "id")?, &service_form(m)?).await?;
            print_notification(&Notification::success("Servicio actualizado"));
        }
        Some(("delete", m)) => {
            api.delete_service(arg(m, "id")?).await?;
            print_notification(&Notification::success("Servicio eliminado"));
        }
        _ => {}
    }

    store.refresh_services(api).await;
    print_table(&view::services_table(&store.services));
    Ok(())
}

async fn staff(api: &ApiClient, store: &mut Store, m: &ArgMatches) -> Result<()> {
    if let Some(("add", m)) = m.subcommand() {
        let form = StaffForm {
            name: arg(m, "name")?,
            role: arg(m, "role")?,
        };
        api.create_staff(&form).await?;
        print_notification(&Notification::success("Personal agregado"));
    }

    store.refresh_staff(api).await;
    print_table(&view::staff_table(&store.staff));
    Ok(())
}

async fn users(api: &ApiClient, store: &mut Store, m: &ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", m)) => {
            let form = UserForm {
                name: arg(m, "name")?,
                email: arg(m, "user_email")?,
                role: arg(m, "role")?,
            };
            view::validate_user(&form).map_err(|e| anyhow!(e))?;
            api.create_user(&form).await?;
            print_notification(&Notification::success("Usuario creado exitosamente"));
        }
        Some(("show", m)) => {
            let id: i64 = arg(m, "id")?;
            store.refresh_users(api).await;
            let user = store
                .users
                .iter()
                .find(|u| u.id == id)
                .ok_or_else(|| anyhow!("no user #{}", id))?;
            println!("{}", view::user_details(user));
            return Ok(());
        }
        _ => {}
    }

    store.refresh_users(api).await;
    print_table(&view::users_table(&store.users));
    Ok(())
}

async fn appointments(api: &ApiClient, store: &mut Store, m: &ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", m)) => {
            let form = AppointmentForm {
                client_id: arg(m, "client")?,
                staff_id: opt(m, "staff"),
                date: arg(m, "date")?,
                time: arg(m, "time")?,
                duration: arg(m, "duration")?,
                notes: opt(m, "notes"),
            };
            api.create_appointment(&form).await?;
            print_notification(&Notification::success("Cita creada"));
        }
        Some(("status", m)) => {
            api.update_appointment_status(arg(m, "id")?, &arg::<String>(m, "status")?)
                .await?;
            print_notification(&Notification::success("Estado actualizado"));
        }
        _ => {}
    }

    store.refresh_appointments(api).await;
    print_table(&view::appointments_table(&store.appointments));
    Ok(())
}

/// `7` or `7:2` for two of service 7.
fn parse_line(raw: &str) -> Result<(i64, Option<i64>)> {
    let (id, quantity) = match raw.split_once(':') {
        Some((id, quantity)) => (id, Some(quantity)),
        None => (raw, None),
    };
    let id = id.trim().parse().with_context(|| format!("bad service id '{}'", raw))?;
    let quantity = quantity
        .map(|q| q.trim().parse())
        .transpose()
        .with_context(|| format!("bad quantity in '{}'", raw))?;
    Ok((id, quantity))
}

async fn invoices(api: &ApiClient, store: &mut Store, m: &ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", m)) => {
            let detail = api.read_invoice(arg(m, "id")?).await?;
            print_table(&view::invoices_table(std::slice::from_ref(&detail.invoice)));

            let mut lines = Table::new();
            lines.add_row(row![Fb => "Servicio", "Cantidad", "Precio", "Total"]);
            for line in &detail.lines {
                lines.add_row(row![
                    line.description,
                    line.quantity,
                    view::money(line.unit_price),
                    view::money(line.line_total)
                ]);
            }
            lines.printstd();

            if let Some(payment) = detail.payment {
                println!("Pago: {} ({}) {}", view::money(payment.amount), payment.method, payment.paid_at);
            }
            return Ok(());
        }
        Some(("add", m)) => {
            store.refresh_services(api).await;

            let mut services = Vec::new();
            for raw in m.get_many::<String>("service").into_iter().flatten() {
                let (service_id, quantity) = parse_line(raw)?;
                let service = store
                    .services
                    .iter()
                    .find(|s| s.id == service_id)
                    .ok_or_else(|| anyhow!("no active service #{}", service_id))?;
                services.push(InvoiceLineForm {
                    service_id,
                    name: service.name.clone(),
                    price: service.price,
                    quantity,
                });
            }

            let form = InvoiceForm {
                client_id: arg(m, "client")?,
                appointment_id: opt(m, "appointment"),
                services,
                tax: opt(m, "tax"),
                tip: opt(m, "tip"),
                payment_method: arg::<String>(m, "method")?.parse::<PaymentMethod>()?,
            };
            view::validate_invoice(&form).map_err(|e| anyhow!(e))?;

            let created = api.create_invoice(&form).await?;
            print_notification(&Notification::success(format!(
                "Factura {} creada por {}",
                created.invoice_number,
                view::money(created.total)
            )));
        }
        _ => {}
    }

    store.refresh_invoices(api).await;
    print_table(&view::invoices_table(&store.invoices));
    Ok(())
}

async fn attendance(api: &ApiClient, store: &mut Store, m: &ArgMatches) -> Result<()> {
    let mut date = None;
    match m.subcommand() {
        Some(("add", m)) => {
            let form = AttendanceForm {
                staff_id: arg(m, "staff")?,
                date: arg(m, "date")?,
                check_in: arg(m, "check_in")?,
                check_out: opt(m, "check_out"),
                break_minutes: opt(m, "break"),
            };
            api.create_attendance(&form).await?;
            print_notification(&Notification::success("Asistencia registrada"));
            date = Some(form.date);
        }
        Some(("list", m)) => date = opt::<String>(m, "date"),
        _ => {}
    }

    store.refresh_attendance(api, date.as_deref()).await;
    print_table(&view::attendance_table(&store.attendance));
    Ok(())
}

async fn reports(api: &ApiClient, store: &mut Store, range: &DateRange) -> Result<()> {
    store.refresh_reports(api, range).await;

    match &store.income {
        Some(income) => print_table(&view::income_table(income)),
        None => print_notification(&Notification::warning("No se pudo generar el reporte de ingresos")),
    }
    print_table(&view::sales_table(&store.sales));
    Ok(())
}

async fn campaigns(api: &ApiClient, store: &mut Store, m: &ArgMatches) -> Result<()> {
    if let Some(("add", m)) = m.subcommand() {
        let form = CampaignForm {
            name: arg(m, "name")?,
            channel: arg(m, "channel")?,
            start_date: arg(m, "start")?,
            end_date: arg(m, "end")?,
            budget: arg(m, "budget")?,
        };
        api.create_campaign(&form).await?;
        print_notification(&Notification::success("Campaña creada"));
    }

    store.refresh_campaigns(api).await;
    print_table(&view::campaigns_table(&store.campaigns));
    Ok(())
}

fn print_table(model: &view::Table) {
    if model.is_empty() {
        println!("{}", model.empty_message);
        return;
    }

    let mut table = Table::new();
    table.set_titles(Row::new(
        model
            .headers
            .iter()
            .map(|h| Cell::new(h).with_style(Attr::Bold))
            .collect(),
    ));
    for row in &model.rows {
        table.add_row(Row::new(row.iter().map(|c| Cell::new(c)).collect()));
    }
    table.printstd();
}

fn notify(nav: &mut Navigator) {
    for n in nav.notifications() {
        print_notification(&n);
    }
}

fn print_notification(n: &Notification) {
    let (label, text_color) = match n.kind {
        NotificationKind::Success => ("OK", color::GREEN),
        NotificationKind::Error => ("ERROR", color::RED),
        NotificationKind::Info => ("INFO", color::BLUE),
        NotificationKind::Warning => ("AVISO", color::YELLOW),
    };

    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_CLEAN);
    table.add_row(Row::new(vec![
        Cell::new(label).with_style(Attr::ForegroundColor(text_color)).with_style(Attr::Bold),
        Cell::new(&n.message),
    ]));
    table.printstd();
}
