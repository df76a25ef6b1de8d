//! Writes the JSON schema of every request body to a directory, one file
//! per body, for client generation and API docs.

use anyhow::Context;
use clap::Parser;
use eventos::api::rest::ErrorBody;
use eventos::api::rest::handlers::back_office::CachePut;
use eventos::api::rest::handlers::payments::RejectRefund;
use eventos::api::rest::handlers::pdv::StockAdjustment;
use eventos::application::services::{
    CheckinRequest, CreatePayment, NotificationRequest, RefundRequest, SaleRequest,
};
use eventos::domain::entities::{EventDetails, ParticipantDetails, ProductDetails, ProductUpdate};
use schemars::schema::RootSchema;
use schemars::schema_for;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "export_schemas")]
#[command(about = "Export JSON schemas of the API request bodies")]
struct Cli {
    /// Output directory
    #[arg(long, default_value = "schemas")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("creating {}", cli.out.display()))?;

    let schemas: Vec<(&str, RootSchema)> = vec![
        ("event", schema_for!(EventDetails)),
        ("participant", schema_for!(ParticipantDetails)),
        ("checkin", schema_for!(CheckinRequest)),
        ("product", schema_for!(ProductDetails)),
        ("product_update", schema_for!(ProductUpdate)),
        ("stock_adjustment", schema_for!(StockAdjustment)),
        ("sale", schema_for!(SaleRequest)),
        ("payment", schema_for!(CreatePayment)),
        ("refund", schema_for!(RefundRequest)),
        ("refund_rejection", schema_for!(RejectRefund)),
        ("notification", schema_for!(NotificationRequest)),
        ("cache_put", schema_for!(CachePut)),
        ("error", schema_for!(ErrorBody)),
    ];

    for (name, schema) in schemas {
        let path = cli.out.join(format!("{name}.schema.json"));
        let json = serde_json::to_string_pretty(&schema)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("{}", path.display());
    }
    Ok(())
}
