//! # Seed Data Generator
//!
//! Populates the local database with demo shipments for development.
//!
//! ## Usage
//! ```bash
//! # Generate 50 shipments (default)
//! cargo run -p shipdesk-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p shipdesk-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p shipdesk-db --bin seed -- --db ./data/shipdesk.db
//! ```
//!
//! ## Generated Data
//! - Master data: shippers, consignees, product types, destinations
//! - Shipments `DEMO-00001`, `DEMO-00002`, ... with 1-4 boxes each
//! - 1-3 product lines per box

use chrono::Utc;
use std::env;
use uuid::Uuid;

use shipdesk_core::{
    Dimensions, InvoiceNumber, MasterKind, MasterRecord, Money, Party, Product, Shipment,
    ShipmentBox, ShipmentStatus, Weight,
};
use shipdesk_db::{Database, DbConfig};

const SHIPPERS: &[&str] = &["Northwind Traders", "Contoso Exports", "Blue Yonder Textiles"];

const CONSIGNEES: &[&str] = &["Fabrikam GmbH", "Litware Inc", "Tailspin Retail", "Wingtip Stores"];

const DESTINATIONS: &[&str] = &["LHR", "JFK", "DXB", "FRA", "SIN"];

/// (code, description, grams per unit, rate cents per kg)
const PRODUCT_TYPES: &[(&str, &str, i64, i64)] = &[
    ("DOCS", "Commercial documents", 250, 1_500),
    ("GARMENTS", "Cotton shirts", 300, 800),
    ("LEATHER", "Leather gloves", 180, 2_200),
    ("SPORTS", "Footballs", 450, 950),
    ("SURGICAL", "Surgical scissors", 120, 3_400),
];

const STATUSES: &[ShipmentStatus] = &[
    ShipmentStatus::Pending,
    ShipmentStatus::Pending,
    ShipmentStatus::InTransit,
    ShipmentStatus::Delivered,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./shipdesk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Shipdesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of shipments to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./shipdesk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Shipdesk Seed Data Generator");
    println!("============================");
    println!("Database:  {}", db_path);
    println!("Shipments: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.shipments().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} shipments", existing);
        println!("  Skipping seed to avoid mixing demo and real data.");
        return Ok(());
    }

    seed_master_data(&db).await?;
    println!("✓ Master data written");

    let start = std::time::Instant::now();
    let mut boxes = 0;
    let mut products = 0;

    for n in 0..count {
        let (b, p) = seed_shipment(&db, n).await?;
        boxes += b;
        products += p;

        if (n + 1) % 100 == 0 {
            println!("  Generated {} shipments...", n + 1);
        }
    }

    println!();
    println!(
        "✓ Generated {} shipments, {} boxes, {} products in {:?}",
        count,
        boxes,
        products,
        start.elapsed()
    );

    Ok(())
}

async fn seed_master_data(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();
    let mut entries: Vec<MasterRecord> = Vec::new();

    let named = [
        (MasterKind::Shipper, SHIPPERS),
        (MasterKind::Consignee, CONSIGNEES),
        (MasterKind::Destination, DESTINATIONS),
    ];
    for (kind, names) in named {
        for (idx, name) in names.iter().enumerate() {
            entries.push(MasterRecord {
                id: Uuid::new_v4().to_string(),
                kind,
                code: format!("{}-{:02}", kind.as_str().to_uppercase(), idx + 1),
                name: name.to_string(),
                details: None,
                updated_at: now,
            });
        }
    }

    for (code, description, _, _) in PRODUCT_TYPES {
        entries.push(MasterRecord {
            id: Uuid::new_v4().to_string(),
            kind: MasterKind::ProductType,
            code: code.to_string(),
            name: description.to_string(),
            details: None,
            updated_at: now,
        });
    }

    for entry in &entries {
        db.master_data().upsert(entry).await?;
    }
    Ok(())
}

/// Writes one shipment tree; returns (boxes, products) written.
async fn seed_shipment(db: &Database, seed: usize) -> Result<(usize, usize), Box<dyn std::error::Error>> {
    let now = Utc::now();
    let invoice = InvoiceNumber::parse(&format!("DEMO-{:05}", seed + 1))?;

    let mut shipment = Shipment::new(invoice.clone(), now);
    shipment.shipper = Party {
        name: SHIPPERS[seed % SHIPPERS.len()].to_string(),
        address: "Industrial Estate, Plot 12".to_string(),
        phone: Some(format!("+92-300-{:07}", seed * 37 % 10_000_000)),
    };
    shipment.consignee = Party {
        name: CONSIGNEES[seed % CONSIGNEES.len()].to_string(),
        address: "Harbour Road 4".to_string(),
        phone: None,
    };
    shipment.origin = "SKT".to_string();
    shipment.destination = DESTINATIONS[seed % DESTINATIONS.len()].to_string();
    shipment.status = STATUSES[seed % STATUSES.len()];
    db.shipments().upsert(&shipment).await?;

    let box_count = 1 + seed % 4;
    let mut product_count = 0;

    for b in 0..box_count {
        let record = ShipmentBox {
            id: Uuid::new_v4().to_string(),
            invoice_number: invoice.clone(),
            box_number: format!("{}/{}", b + 1, box_count),
            dimensions: Dimensions::new(
                30 + (seed as u32 * 7 + b as u32) % 40,
                25 + (seed as u32 * 3) % 20,
                20 + (b as u32 * 5) % 25,
            ),
            created_at: now,
            updated_at: now,
        };
        db.boxes().upsert(&record).await?;

        for p in 0..(1 + (seed + b) % 3) {
            let (code, description, grams, rate) = PRODUCT_TYPES[(seed + b + p) % PRODUCT_TYPES.len()];
            let line = Product {
                id: Uuid::new_v4().to_string(),
                box_id: record.id.clone(),
                product_type: code.to_string(),
                description: description.to_string(),
                weight: Weight::from_grams(grams),
                rate: Money::from_cents(rate),
                quantity: (1 + (seed * 13 + p) % 24) as u32,
                created_at: now,
                updated_at: now,
            };
            db.products().upsert(&line).await?;
            product_count += 1;
        }
    }

    Ok((box_count, product_count))
}
