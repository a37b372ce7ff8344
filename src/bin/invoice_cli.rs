use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use invoice_backend::{
    client::{
        ApiClient, DraftRow, HistoryFilter, InvoiceDraft, InvoiceHistory,
        history::{GroupField, PaymentFilter, SortField},
    },
    dto::{auth::RegisterRequest, shops::CreateShopRequest},
    routes::params::{InvoiceListQuery, SortOrder},
};

#[derive(Parser)]
#[command(name = "invoice-cli")]
#[command(about = "Shop invoicing from the terminal", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "INVOICE_API_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Bearer token from `login`
    #[arg(long, env = "INVOICE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print a token
    Login { username: String, password: String },

    /// Create an account and print a token
    Register {
        login: String,
        email: String,
        password: String,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Show the current profile and shop context
    Me,

    /// Change the password of the current user
    Passwd { old: String, new: String },

    /// Manage the operator's shop
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },

    /// List invoices of the current shop
    List {
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        min: Option<Decimal>,
        #[arg(long)]
        max: Option<Decimal>,
        #[arg(long, value_enum, default_value = "all")]
        paid: PaidArg,
        #[arg(long, value_enum, default_value = "date")]
        sort: SortArg,
        /// Sort ascending (default is descending)
        #[arg(long)]
        asc: bool,
        #[arg(long, value_enum)]
        group: Option<GroupArg>,
    },

    /// Show one invoice with its items
    Show { id: i32 },

    /// Create an invoice
    Create {
        #[arg(long)]
        contact: String,
        #[arg(long)]
        info: Option<String>,
        /// Line item as name:quantity:price, repeatable
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        #[arg(long)]
        paid: bool,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Mark an invoice paid or unpaid
    Pay {
        id: i32,
        #[arg(long)]
        undo: bool,
    },

    /// Delete an invoice
    Delete { id: i32 },

    /// Totals of the current shop
    Stats {
        #[arg(long)]
        shop: Option<i32>,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// Create the operator's shop
    Create {
        name: String,
        #[arg(long)]
        address: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaidArg {
    All,
    Paid,
    Unpaid,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Number,
    Date,
    Contact,
    Total,
    Paid,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupArg {
    Paid,
    Date,
    Contact,
}

fn parse_item(raw: &str) -> Result<DraftRow> {
    let mut parts = raw.rsplitn(3, ':');
    let price = parts.next().context("missing price")?;
    let quantity = parts.next().context("missing quantity")?;
    let name = parts.next().context("missing name")?;
    Ok(DraftRow::new(name, quantity, price))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut client = ApiClient::new(&cli.url)?;
    if let Some(token) = &cli.token {
        client = client.with_token(token.clone())?;
    }

    match cli.command {
        Commands::Login { username, password } => {
            let session = client.login(&username, &password).await?;
            println!("{}", session.token);
        }
        Commands::Register {
            login,
            email,
            password,
            phone,
        } => {
            let session = client
                .register(&RegisterRequest {
                    login,
                    email,
                    password,
                    phone,
                })
                .await?;
            println!("{}", session.token);
        }
        Commands::Me => {
            let profile = client.me().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Passwd { old, new } => {
            client.change_password(&old, &new).await?;
            println!("password updated");
        }
        Commands::Shop {
            command: ShopCommands::Create { name, address },
        } => {
            let shop = client.create_shop(&CreateShopRequest { name, address }).await?;
            println!("shop #{} {}", shop.id, shop.name);
            print_token(&client);
        }
        Commands::List {
            number,
            from,
            to,
            contact,
            min,
            max,
            paid,
            sort,
            asc,
            group,
        } => {
            let session = client.session().context("log in first")?;
            let shop_id = session.current_shop_id();
            let query = InvoiceListQuery {
                shop_id,
                per_page: Some(100),
                ..Default::default()
            };
            let invoices = client.list_all_invoices(&query).await?;

            let mut history = InvoiceHistory::new(shop_id, session.last_invoice_id());
            history.load(&invoices);
            history.search(&HistoryFilter {
                number,
                date_from: from,
                date_to: to,
                contact,
                amount_from: min,
                amount_to: max,
                payment: match paid {
                    PaidArg::All => PaymentFilter::All,
                    PaidArg::Paid => PaymentFilter::Paid,
                    PaidArg::Unpaid => PaymentFilter::Unpaid,
                },
            })?;
            let field = match sort {
                SortArg::Number => SortField::Number,
                SortArg::Date => SortField::Date,
                SortArg::Contact => SortField::Contact,
                SortArg::Total => SortField::Total,
                SortArg::Paid => SortField::Paid,
            };
            history.sort(field, if asc { SortOrder::Asc } else { SortOrder::Desc });

            match group {
                Some(group) => {
                    let field = match group {
                        GroupArg::Paid => GroupField::Paid,
                        GroupArg::Date => GroupField::Date,
                        GroupArg::Contact => GroupField::Contact,
                    };
                    for g in history.group_by(field) {
                        println!("== {} ({} pcs, {})", g.label, g.count, g.total);
                        for row in &g.rows {
                            print_row(row);
                        }
                    }
                }
                None => history.rows().iter().for_each(print_row),
            }
            println!("{} shown, {} loaded", history.rows().len(), invoices.len());
        }
        Commands::Show { id } => {
            let saved = client.get_invoice(id).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        Commands::Create {
            contact,
            info,
            items,
            paid,
            date,
        } => {
            let session = client.session().context("log in first")?;
            let shop_id = session.current_shop_id();
            println!(
                "invoice #{}",
                InvoiceDraft::predicted_number(session.last_invoice_id())
            );

            let mut draft = InvoiceDraft::new(date.unwrap_or_else(|| Utc::now().date_naive()));
            draft.contact = contact;
            draft.additional_info = info.unwrap_or_default();
            for (idx, raw) in items.iter().enumerate() {
                if draft.rows().len() <= idx {
                    draft.add_row();
                }
                if let Some(row) = draft.row_mut(idx) {
                    *row = parse_item(raw).with_context(|| format!("bad --item '{raw}'"))?;
                }
            }
            if paid {
                draft.toggle_paid();
            }
            let payload = draft.collect(shop_id)?;

            let saved = client.create_invoice(&payload).await?;
            println!(
                "saved #{} total {}",
                saved.invoice.id, saved.invoice.total_amount
            );
            print_token(&client);
        }
        Commands::Pay { id, undo } => {
            let invoice = client.set_paid(id, !undo).await?;
            println!(
                "#{} {}",
                invoice.id,
                if invoice.is_paid { "paid" } else { "unpaid" }
            );
        }
        Commands::Delete { id } => {
            client.delete_invoice(id).await?;
            println!("deleted #{id}");
            print_token(&client);
        }
        Commands::Stats { shop } => {
            let stats = client.stats(shop).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn print_row(row: &invoice_backend::client::InvoiceRow) {
    println!(
        "#{:<6} {}  {:<30} {:>12}  {}",
        row.number,
        row.date,
        row.contact,
        row.total,
        if row.is_paid { "paid" } else { "unpaid" }
    );
}

fn print_token(client: &ApiClient) {
    if let Some(session) = client.session() {
        eprintln!("updated token: {}", session.token);
    }
}
