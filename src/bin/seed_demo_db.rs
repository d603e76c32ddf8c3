use chrono::Local;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use retail_orders::api::{CreateOrderRequest, NewClient, NewProduct, OrderItemInput};
use retail_orders::app::{get_default_db_path, AppState, StaticIdentityProvider};
use retail_orders::{logging, OrderStatus};

const SEED_ACTOR: &str = "seed";

struct SeedProduct {
    name: &'static str,
    price: f64,
    stock: i64,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct { name: "Хлеб", price: 45.0, stock: 120 },
    SeedProduct { name: "Молоко", price: 89.9, stock: 80 },
    SeedProduct { name: "Сыр", price: 320.0, stock: 25 },
    SeedProduct { name: "Чай", price: 150.0, stock: 40 },
    SeedProduct { name: "Сахар", price: 75.5, stock: 60 },
];

// (名, 姓, 父称, 出生日期)
const CLIENTS: &[(&str, &str, &str, &str)] = &[
    ("Иван", "Петров", "Сергеевич", "1985-03-12"),
    ("Анна", "Смирнова", "Игоревна", "1992-11-02"),
    ("Olga", "Kuznetsova", "", ""),
];

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let state = AppState::new(db_path, Arc::new(StaticIdentityProvider::admin(SEED_ACTOR)))?;

    seed(&state)?;
    print_quick_counts(&state)?;

    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed(state: &AppState) -> Result<(), Box<dyn Error>> {
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    for p in PRODUCTS {
        let product = state.product_api.create_product(NewProduct {
            name: p.name.to_string(),
            price: p.price,
            stock: p.stock,
            image: None,
        })?;
        product_ids.push(product.id);
    }

    let mut client_ids = Vec::with_capacity(CLIENTS.len());
    for (first, last, middle, birth) in CLIENTS {
        let client = state.client_api.create_client(NewClient {
            first_name: first.to_string(),
            last_name: last.to_string(),
            middle_name: middle.to_string(),
            birth_date: Some(birth.to_string()),
            ..Default::default()
        })?;
        client_ids.push(client.id);
    }

    // 每个客户两张订单，商品轮换
    for (i, client_id) in client_ids.iter().enumerate() {
        for round in 0..2 {
            let first = product_ids[(i + round) % product_ids.len()];
            let second = product_ids[(i + round + 2) % product_ids.len()];
            let status = if round == 0 { OrderStatus::Pending } else { OrderStatus::Ready };

            let change = state.order_api.create_order(CreateOrderRequest {
                client_id: *client_id,
                status,
                items: vec![
                    OrderItemInput { product_id: first, quantity: (round as i64) + 1 },
                    OrderItemInput { product_id: second, quantity: 2 },
                ],
            })?;
            eprintln!(
                "Seeded order {} ({} lines, receipt: {:?})",
                change.order.order.identifier,
                change.order.lines.len(),
                change.receipt
            );
        }
    }

    Ok(())
}

fn print_quick_counts(state: &AppState) -> Result<(), Box<dyn Error>> {
    let (clients, products, orders) = state.lookup_api.counts()?;
    println!("DB: {}", state.db_path);
    println!("clients={} products={} orders={}", clients, products, orders);

    for product in state.lookup_api.list_products(0, 0)? {
        println!("  {:<10} stock={}", product.name, product.stock);
    }
    Ok(())
}
