use std::sync::Arc;

use anyhow::{Context, Result};
use mongodb::{Client, Collection, Database, bson::doc};

use crate::{
    config::AppConfig,
    models::{
        AdvertisementDoc, CartItemDoc, CategoryDoc, DeliveryLocationDoc, FaqDoc, MedicineDoc,
        OrderDoc, PaymentDoc, ReviewDoc, SubscriberDoc, UserDoc,
    },
};

/// Shared application state: one database handle opened at startup and held
/// for the process lifetime (never explicitly closed), plus the shared HTTP
/// client for outbound gateway calls.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub http_client: reqwest::Client,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.database.uri)
            .await
            .context("Failed to create MongoDB client")?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to ping MongoDB")?;
        tracing::info!("Connected to MongoDB successfully");

        Ok(Self {
            db: client.database(&config.database.name),
            http_client: reqwest::Client::new(),
            config: Arc::new(config),
        })
    }

    // Collection accessors. Pure handles; no validation happens at this
    // layer, callers validate before querying.

    pub fn users(&self) -> Collection<UserDoc> {
        self.db.collection("users")
    }

    pub fn medicines(&self) -> Collection<MedicineDoc> {
        self.db.collection("medicines")
    }

    pub fn categories(&self) -> Collection<CategoryDoc> {
        self.db.collection("categories")
    }

    pub fn advertisements(&self) -> Collection<AdvertisementDoc> {
        self.db.collection("advertisements")
    }

    pub fn payments(&self) -> Collection<PaymentDoc> {
        self.db.collection("payments")
    }

    pub fn carts(&self) -> Collection<CartItemDoc> {
        self.db.collection("carts")
    }

    pub fn orders(&self) -> Collection<OrderDoc> {
        self.db.collection("orders")
    }

    pub fn reviews(&self) -> Collection<ReviewDoc> {
        self.db.collection("reviews")
    }

    pub fn faqs(&self) -> Collection<FaqDoc> {
        self.db.collection("faqs")
    }

    pub fn subscribers(&self) -> Collection<SubscriberDoc> {
        self.db.collection("subscribers")
    }

    pub fn delivery_locations(&self) -> Collection<DeliveryLocationDoc> {
        self.db.collection("deliveryLocations")
    }
}
