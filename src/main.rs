//! Bazaar CLI

use std::{
    io::{self, Write},
    process::ExitCode,
    sync::Arc,
};

use bazaar::{
    api::{MarketplaceClient, PageRequest, ProductCatalog, fetch_all_vouchers},
    cart::{CartStore, JsonFileCartStorage},
    checkout::{
        CheckoutDetails, CheckoutFlow, GuestDetails, SessionGate, ShippingAddress,
        StaticSessionProvider, partition_by_shop,
    },
    config::Config,
    logging, receipt,
    shipments::{ShipmentQuoteProvider, ShipmentQuoteRequest},
    uuids::ProductUuid,
    vouchers::{VoucherCatalogState, VoucherSelector},
};
use clap::{Args, Parser, Subcommand};
use jiff::Timestamp;
use rusty_money::iso::Currency;
use tracing::info;

/// Vouchers requested per page when walking the voucher listing.
const VOUCHER_PAGE_SIZE: u32 = 50;

#[derive(Debug, Parser)]
#[command(name = "bazaar", about = "Marketplace cart and checkout", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Inspect or change the persisted cart
    Cart(CartCommand),

    /// List products from the marketplace
    Products(ProductsArgs),

    /// List vouchers that can be applied right now
    Vouchers,

    /// Quote shipping for every shop in the cart and submit the order
    Checkout(CheckoutArgs),
}

#[derive(Debug, Args)]
struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Show cart lines and subtotal
    Show,

    /// Add a product by id, or bump its quantity when already in the cart
    Add { product: ProductUuid },

    /// Increase the quantity of a line
    Increase { product: ProductUuid },

    /// Decrease the quantity of a line, removing it at zero
    Decrease { product: ProductUuid },

    /// Remove a line
    Remove { product: ProductUuid },

    /// Remove every line
    Clear,

    /// Flip cart visibility
    Toggle,
}

#[derive(Debug, Args)]
struct ProductsArgs {
    /// One-based page number
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Products per page
    #[arg(long, default_value_t = 20)]
    per_page: u32,
}

#[derive(Debug, Args)]
struct CheckoutArgs {
    /// Courier code quoted for every shop, e.g. `jne`
    #[arg(long)]
    courier: String,

    /// Destination area code
    #[arg(long)]
    destination: String,

    /// Voucher code to apply
    #[arg(long)]
    voucher: Option<String>,

    /// Person receiving the parcel
    #[arg(long, default_value = "")]
    recipient_name: String,

    /// Recipient phone
    #[arg(long, default_value = "")]
    phone: String,

    /// Street address
    #[arg(long, default_value = "")]
    address: String,

    /// Province
    #[arg(long, default_value = "")]
    province: String,

    /// City
    #[arg(long, default_value = "")]
    city: String,

    /// District
    #[arg(long, default_value = "")]
    district: String,

    /// Postal code
    #[arg(long, default_value = "")]
    postal_code: String,

    /// Guest buyer name
    #[arg(long, default_value = "")]
    guest_name: String,

    /// Guest buyer email
    #[arg(long, default_value = "")]
    guest_email: String,

    /// Guest buyer phone
    #[arg(long, default_value = "")]
    guest_phone: String,

    /// Note for the sellers
    #[arg(long)]
    note: Option<String>,
}

impl CheckoutArgs {
    fn details(self) -> CheckoutDetails {
        CheckoutDetails {
            address: ShippingAddress {
                recipient_name: self.recipient_name,
                phone: self.phone,
                address: self.address,
                province: self.province,
                city: self.city,
                district: self.district,
                postal_code: self.postal_code,
            },
            guest: GuestDetails {
                name: self.guest_name,
                email: self.guest_email,
                phone: self.guest_phone,
            },
            note: self.note.filter(|note| !note.trim().is_empty()),
        }
    }
}

type Cart = CartStore<'static, JsonFileCartStorage>;

#[tokio::main]
pub async fn main() -> ExitCode {
    let _env = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _printed = error.print();

            return if error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(error) = logging::init_subscriber(&cli.config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for setup errors"
        )]
        {
            eprintln!("{error}");
        }

        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            #[expect(clippy::print_stderr, reason = "command errors are reported to the user")]
            {
                eprintln!("{error}");
            }

            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = cli.config;
    let currency = config.storage.currency().map_err(|error| error.to_string())?;

    match cli.command {
        Commands::Cart(CartCommand { command }) => {
            let mut cart = CartStore::restore(config.storage.cart_storage(), currency);

            cart_command(&mut cart, command, &config).await
        }
        Commands::Products(args) => {
            let client = client(&config)?;
            let page = client
                .list_products(PageRequest {
                    page: args.page.max(1),
                    per_page: args.per_page.max(1),
                })
                .await
                .map_err(|error| format!("failed to list products: {error}"))?;

            receipt::write_products(io::stdout().lock(), &page.items)
                .map_err(|error| error.to_string())?;

            writeln!(
                io::stdout().lock(),
                "page {} of {} ({} products)",
                page.pagination.page,
                page.pagination.last_page,
                page.pagination.total
            )
            .map_err(|error| error.to_string())
        }
        Commands::Vouchers => {
            let client = client(&config)?;
            let selector = load_vouchers(&client, currency).await;

            if let Some(message) = voucher_failure(&selector) {
                return Err(message);
            }

            receipt::write_vouchers(io::stdout().lock(), selector.vouchers())
                .map_err(|error| error.to_string())
        }
        Commands::Checkout(args) => {
            let mut cart = CartStore::restore(config.storage.cart_storage(), currency);

            checkout(&mut cart, args, &config).await
        }
    }
}

fn client(config: &Config) -> Result<MarketplaceClient, String> {
    MarketplaceClient::new(config.api.marketplace())
        .map_err(|error| format!("failed to build marketplace client: {error}"))
}

async fn cart_command(
    cart: &mut Cart,
    command: CartSubcommand,
    config: &Config,
) -> Result<(), String> {
    match command {
        CartSubcommand::Show => {}
        CartSubcommand::Add { product } => {
            let record = client(config)?
                .get_product(product)
                .await
                .map_err(|error| format!("failed to fetch product {product}: {error}"))?;
            let product = record
                .into_product(cart.currency())
                .map_err(|error| error.to_string())?;

            cart.add_item(product);
        }
        CartSubcommand::Increase { product } => cart.increase_item_quantity(product),
        CartSubcommand::Decrease { product } => cart.decrease_item_quantity(product),
        CartSubcommand::Remove { product } => cart.remove_item(product),
        CartSubcommand::Clear => cart.clear(),
        CartSubcommand::Toggle => cart.toggle(),
    }

    show_cart(cart)
}

fn show_cart(cart: &Cart) -> Result<(), String> {
    let mut out = io::stdout().lock();

    receipt::write_cart(&mut out, cart.items(), cart.currency())
        .map_err(|error| error.to_string())?;

    let visibility = if cart.is_open() { "open" } else { "closed" };

    writeln!(out, "{} item(s), cart {visibility}", cart.item_count())
        .map_err(|error| error.to_string())
}

async fn load_vouchers(
    client: &MarketplaceClient,
    currency: &'static Currency,
) -> VoucherSelector<'static> {
    let mut selector = VoucherSelector::new();
    let ticket = selector.begin_fetch();
    let result = fetch_all_vouchers(client, currency, VOUCHER_PAGE_SIZE).await;

    selector.finish_fetch(ticket, result, Timestamp::now());

    selector
}

fn voucher_failure(selector: &VoucherSelector<'_>) -> Option<String> {
    match selector.state() {
        VoucherCatalogState::Failed(message) => {
            Some(format!("failed to load vouchers: {message}"))
        }
        _ => None,
    }
}

async fn checkout(cart: &mut Cart, args: CheckoutArgs, config: &Config) -> Result<(), String> {
    if cart.is_empty() {
        return Err("the cart is empty".to_string());
    }

    let client = client(config)?;
    let currency = cart.currency();

    let gate = SessionGate::new(Arc::new(StaticSessionProvider::new(config.api.session())));
    let mut flow = CheckoutFlow::new(gate.enter().await);

    info!(kind = ?flow.strategy().kind(), "starting checkout");

    if let Some(code) = &args.voucher {
        let mut selector = load_vouchers(&client, currency).await;

        if let Some(message) = voucher_failure(&selector) {
            return Err(message);
        }

        let voucher = selector
            .select(Some(code))
            .map_err(|error| error.to_string())?
            .cloned();

        flow.set_voucher(voucher);
    }

    for partition in partition_by_shop(cart.items()) {
        let request =
            ShipmentQuoteRequest::for_partition(&partition, &args.destination, &args.courier);
        let ticket = flow.begin_quote(partition.shop);

        let records = client
            .quote(request.clone())
            .await
            .map_err(|error| format!("failed to quote shipping for {}: {error}", partition.shop))?;

        let cheapest = records
            .into_iter()
            .min_by_key(|record| record.cost)
            .ok_or_else(|| {
                format!("{} offers no service to {}", args.courier, args.destination)
            })?;

        let quote = cheapest
            .into_quote(&request, currency)
            .map_err(|error| error.to_string())?;

        flow.finish_quote(ticket, quote);
    }

    *flow.details_mut() = args.details();

    let summary = flow.summary(cart).map_err(|error| error.to_string())?;

    receipt::write_checkout(io::stdout().lock(), &summary, flow.voucher())
        .map_err(|error| error.to_string())?;

    let created = flow
        .submit(cart, &client, Timestamp::now())
        .await
        .map_err(|error| error.to_string())?;

    receipt::write_transactions(io::stdout().lock(), &created).map_err(|error| error.to_string())
}
