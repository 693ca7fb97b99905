use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pharmacy_frontend::middleware::Navigation;
use pharmacy_frontend::models::auth::RegisterRequest;
use pharmacy_frontend::models::pharmacy::{
    NewPayment, NewSale, NewStore, PaymentMethod, PaymentUpdate, RecordId, SaleUpdate, StoreUpdate,
};
use pharmacy_frontend::services::resources::{Approvable, ResourceClient};
use pharmacy_frontend::AppState;
use rust_decimal::Decimal;
use std::fmt::Debug;

#[derive(Parser)]
#[command(name = "pharmacy-frontend", version, about = "Pharmacy management client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "PHARMACY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account (does not log in)
    Register {
        #[arg(long)]
        email: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "PHARMACY_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "PHARMACY_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the stored identity
    Whoami,
    /// Check whether a screen may be opened with the stored session
    Open { path: String },
    /// Manage stores
    Stores {
        #[command(subcommand)]
        action: StoreAction,
    },
    /// Manage sales
    Sales {
        #[command(subcommand)]
        action: SaleAction,
    },
    /// Manage payments
    Payments {
        #[command(subcommand)]
        action: PaymentAction,
    },
    /// Show the login audit log (admin)
    Activity,
    /// Show sales and payment totals with recent logins (admin)
    Summary,
}

#[derive(Subcommand)]
pub enum StoreAction {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
    },
    /// Change a store (admin)
    Edit {
        id: RecordId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, conflicts_with = "clear_owner")]
        owner: Option<RecordId>,
        /// Remove the owner
        #[arg(long)]
        clear_owner: bool,
    },
    #[command(flatten)]
    Record(RecordAction),
}

#[derive(Subcommand)]
pub enum SaleAction {
    Add {
        #[arg(long)]
        store: RecordId,
        #[arg(long)]
        medicine: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        price: Decimal,
    },
    /// Change a sale (admin)
    Edit {
        id: RecordId,
        #[arg(long)]
        store: Option<RecordId>,
        #[arg(long)]
        medicine: Option<String>,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        price: Option<Decimal>,
    },
    #[command(flatten)]
    Record(RecordAction),
}

#[derive(Subcommand)]
pub enum PaymentAction {
    Add {
        #[arg(long)]
        sale: RecordId,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "cash")]
        method: PaymentMethod,
    },
    /// Change a payment (admin)
    Edit {
        id: RecordId,
        #[arg(long)]
        sale: Option<RecordId>,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        method: Option<PaymentMethod>,
    },
    #[command(flatten)]
    Record(RecordAction),
}

/// Actions shared by every record type.
#[derive(Subcommand)]
pub enum RecordAction {
    List,
    Show(IdArg),
    /// Toggle the approval flag (admin)
    Approve(IdArg),
    /// Delete a record (admin)
    Delete(IdArg),
}

#[derive(Args)]
pub struct IdArg {
    pub id: RecordId,
}

pub async fn run(command: Command, state: &AppState) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let outcome = state.auth.login(&username, &password).await?;
            println!(
                "Logged in as {}{}, landing on {}",
                outcome.username,
                if outcome.is_admin { " (admin)" } else { "" },
                outcome.landing
            );
        }
        Command::Register {
            email,
            username,
            password,
            confirm_password,
        } => {
            let outcome = state
                .auth
                .register(RegisterRequest {
                    email,
                    username,
                    password,
                    confirm_password,
                })
                .await?;
            println!("{} Log in at {}", outcome.message, outcome.next);
        }
        Command::Logout => {
            let next = state.auth.logout();
            println!("Logged out, continue at {next}");
        }
        Command::Whoami => {
            let session = state.auth.current_session();
            match (&session.username, session.is_authenticated()) {
                (Some(username), true) => println!(
                    "{}{}",
                    username,
                    if session.is_admin() { " (admin)" } else { "" }
                ),
                _ => println!("Not logged in"),
            }
        }
        Command::Open { path } => match state.navigate(&path) {
            Navigation::Render(route) => println!("{route}"),
            Navigation::Redirect(route) => println!("redirect -> {route}"),
            Navigation::NotFound => println!("not found: {path}"),
        },
        Command::Stores { action } => match action {
            StoreAction::Add { name, location } => {
                let store = state.stores().create(&NewStore { name, location }).await?;
                println!("{store:#?}");
            }
            StoreAction::Edit {
                id,
                name,
                location,
                owner,
                clear_owner,
            } => {
                state.require_admin()?;
                let changes = StoreUpdate {
                    name,
                    location,
                    owner: if clear_owner { Some(None) } else { owner.map(Some) },
                };
                let store = state.stores().update(id, &changes).await?;
                println!("{store:#?}");
            }
            StoreAction::Record(action) => {
                run_record_action(state, &state.stores(), action).await?
            }
        },
        Command::Sales { action } => match action {
            SaleAction::Add {
                store,
                medicine,
                quantity,
                price,
            } => {
                let sale = state
                    .sales()
                    .create(&NewSale {
                        store,
                        medicine,
                        quantity,
                        price,
                    })
                    .await?;
                println!("{sale:#?}");
            }
            SaleAction::Edit {
                id,
                store,
                medicine,
                quantity,
                price,
            } => {
                state.require_admin()?;
                let changes = SaleUpdate {
                    store,
                    medicine,
                    quantity,
                    price,
                };
                let sale = state.sales().update(id, &changes).await?;
                println!("{sale:#?}");
            }
            SaleAction::Record(action) => run_record_action(state, &state.sales(), action).await?,
        },
        Command::Payments { action } => match action {
            PaymentAction::Add {
                sale,
                amount,
                method,
            } => {
                let payment = state
                    .payments()
                    .create(&NewPayment {
                        sale,
                        amount,
                        method,
                    })
                    .await?;
                println!("{payment:#?}");
            }
            PaymentAction::Edit {
                id,
                sale,
                amount,
                method,
            } => {
                state.require_admin()?;
                let changes = PaymentUpdate {
                    sale,
                    amount,
                    method,
                };
                let payment = state.payments().update(id, &changes).await?;
                println!("{payment:#?}");
            }
            PaymentAction::Record(action) => {
                run_record_action(state, &state.payments(), action).await?
            }
        },
        Command::Activity => {
            state.require_admin()?;
            for entry in state.login_activity().list().await? {
                println!("{}  {}", entry.logged_in_at.to_rfc3339(), entry.username);
            }
        }
        Command::Summary => {
            let summary = state.admin_summary().await?;
            println!(
                "stores: {}  sales: {}  payments: {}",
                summary.stores, summary.sales, summary.payments
            );
            println!("total sales:    {}", summary.total_sales);
            println!("total payments: {}", summary.total_payments);
            println!("pending:        {}", summary.pending);
            println!("recent logins:");
            for entry in &summary.recent_logins {
                println!("  {}  {}", entry.logged_in_at.to_rfc3339(), entry.username);
            }
        }
    }

    Ok(())
}

async fn run_record_action<T>(
    state: &AppState,
    client: &ResourceClient<T>,
    action: RecordAction,
) -> Result<()>
where
    T: Approvable + Debug,
{
    if matches!(action, RecordAction::Approve(_) | RecordAction::Delete(_)) {
        state.require_admin()?;
    }

    match action {
        RecordAction::List => {
            for record in client.list().await? {
                println!("{record:?}");
            }
        }
        RecordAction::Show(IdArg { id }) => println!("{:#?}", client.get(id).await?),
        RecordAction::Approve(IdArg { id }) => {
            let record = client.get(id).await?;
            let updated = client.toggle_approved(&record).await?;
            println!(
                "#{} {}",
                updated.id(),
                if updated.approved() { "approved" } else { "unapproved" }
            );
        }
        RecordAction::Delete(IdArg { id }) => {
            client.delete(id).await?;
            println!("#{id} deleted");
        }
    }
    Ok(())
}
