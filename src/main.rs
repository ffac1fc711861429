use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use storefront_cart::config::cli::Command;
use storefront_cart::core::{CatalogClient, ConfigProvider, ProductId};
use storefront_cart::utils::error::{CartError, ErrorSeverity};
use storefront_cart::utils::validation::{parse_quantity, Validate};
use storefront_cart::utils::logger;
use storefront_cart::{
    CartEngine, CartStore, CartView, CheckoutFlow, CheckoutOutcome, CliConfig, FileSlot,
    HttpCatalogClient, Reconciler, TomlConfig,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    if config.logging.json {
        logger::init_json_logger(config.logging.verbose);
    } else {
        logger::init_cli_logger(config.logging.verbose);
    }
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    if let Err(err) = run(&cli.command, &config).await {
        match err.downcast_ref::<CartError>() {
            Some(e) => {
                tracing::error!(
                    "❌ {} (Category: {:?}, Severity: {:?})",
                    err,
                    e.category(),
                    e.severity()
                );
                fail(e);
            }
            None => {
                tracing::error!("❌ {:#}", err);
                eprintln!("❌ {:#}", err);
                std::process::exit(1);
            }
        }
    }
}

fn fail(e: &CartError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

async fn run(command: &Command, config: &TomlConfig) -> anyhow::Result<()> {
    let catalog = Arc::new(
        HttpCatalogClient::from_config(config).context("failed to set up the catalog client")?,
    );

    match command {
        Command::Categories => list_categories(catalog.as_ref()).await,
        Command::Browse { category } => browse(catalog.as_ref(), *category).await,
        cart_command => run_cart(cart_command, config, catalog).await,
    }
}

async fn run_cart(
    command: &Command,
    config: &TomlConfig,
    catalog: Arc<HttpCatalogClient>,
) -> anyhow::Result<()> {
    let store = CartStore::with_key(FileSlot::new(config.store_path()), config.store_key());
    let mut engine = CartEngine::new(store);
    let reconciler = Reconciler::with_timeout(Arc::clone(&catalog), config.lookup_timeout());

    reconciler.restore(&mut engine).await;
    engine.subscribe(|view: &CartView| {
        tracing::debug!("Cart changed: {} lines, {}", view.line_count, view.header);
    });

    match command {
        Command::Show { html: true } => {
            print!("{}", engine.view().render_html());
            return Ok(());
        }
        Command::Show { html: false } => {}
        Command::Add { pid, quantity } => {
            let id: ProductId = pid.parse()?;
            let quantity = parse_quantity(quantity)?;
            let product = catalog.product(id).await?;
            if !product.available {
                return Err(CartError::ProductUnavailable {
                    id: id.get(),
                    reason: "marked unavailable by the catalog".to_string(),
                }
                .into());
            }
            engine.add_item(id, product.name, product.price, quantity)?;
        }
        Command::Set { pid, quantity } => {
            engine.set_quantity(pid.parse()?, parse_quantity(quantity)?)?;
        }
        Command::Inc { pid } => {
            engine.increment(pid.parse()?);
        }
        Command::Dec { pid } => {
            engine.decrement(pid.parse()?);
        }
        Command::Remove { pid } => {
            engine.remove_item(pid.parse()?);
        }
        Command::Clear => {
            engine.clear();
        }
        Command::Checkout { cancel } => {
            checkout(&mut engine, *cancel);
            return Ok(());
        }
        Command::Categories | Command::Browse { .. } => {}
    }

    print!("{}", engine.view().render_text());
    Ok(())
}

fn checkout(engine: &mut CartEngine<FileSlot>, cancel: bool) {
    let mut flow = CheckoutFlow::new();
    match flow.begin(engine.cart()) {
        CheckoutOutcome::AwaitingConfirmation(summary) => {
            println!("Prepared {}", summary.prepared_label());
            println!("{}", summary);
            if cancel {
                flow.cancel();
                println!("Checkout cancelled, your cart was kept.");
                return;
            }
            match flow.confirm(engine) {
                CheckoutOutcome::Completed(_) => println!("✅ Checkout complete."),
                other => println!("Checkout not completed: {:?}", other),
            }
        }
        CheckoutOutcome::EmptyCart { guidance } => println!("{}", guidance),
        CheckoutOutcome::Completed(_) | CheckoutOutcome::Cancelled => {}
    }
}

async fn list_categories(catalog: &HttpCatalogClient) -> anyhow::Result<()> {
    let categories = catalog.categories().await?;
    if categories.is_empty() {
        println!("No categories found.");
    }
    for category in categories {
        println!("{:>4}  {}", category.catid, category.name);
    }
    Ok(())
}

async fn browse(catalog: &HttpCatalogClient, category: Option<u64>) -> anyhow::Result<()> {
    let products = catalog.products(category).await?;
    if products.is_empty() {
        println!("No products found.");
    }
    for product in products {
        println!(
            "{:>4}  {:<30} ${:>8}  {}",
            product.id,
            product.name,
            product.price.to_string(),
            product.display_image()
        );
    }
    Ok(())
}
