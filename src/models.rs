use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Optional-field counterpart of the driver's chrono bridge. Dates are stored
/// as native BSON datetimes so range filters and sorts compare
/// chronologically, not lexically.
pub(crate) mod bson_datetime_option {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => bson::DateTime::from_chrono(*dt).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(|dt| dt.to_chrono()))
    }
}

fn default_user_role() -> String {
    "user".to_string()
}

// Users

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub name: Option<String>,
    pub email: String,
    #[serde(default = "default_user_role")]
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, with = "bson_datetime_option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// Medicines

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicineDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Category name reference, matched case-insensitively against
    /// `CategoryDoc::category_name`. A value-typed cross-reference, not a
    /// foreign key.
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount: f64,
    pub seller_email: String,
    pub status: String,
    #[serde(default, with = "bson_datetime_option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// Categories

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub category_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

// Advertisements

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub medicine_name: String,
    pub medicine_image: String,
    pub description: String,
    pub seller_email: String,
    #[serde(default)]
    pub is_on_slider: bool,
    pub status: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

// Payments

/// One entry of a payment's embedded cart, attributing quantity/price/seller
/// to a single product. Quantity and unit price are optional in stored data;
/// report aggregation defaults them to 1 and 0.0.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub seller_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub buyer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub total_price: f64,
    /// `pending` or `unpaid` until finalized, then `paid` exactly once.
    pub status: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    #[serde(default, with = "bson_datetime_option", skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cart_items: Vec<LineItem>,
}

// Carts

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub buyer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicine_id: Option<String>,
    pub medicine_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_email: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

// Orders

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub buyer_email: String,
    #[serde(default)]
    pub cart_items: Vec<LineItem>,
    #[serde(default)]
    pub total_price: f64,
    pub status: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
}

// Reviews

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub user_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub rating: i32,
    pub comment: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

// FAQs

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub question: String,
    pub answer: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

// Newsletter subscribers

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub email: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

// Delivery locations

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLocationDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub district: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default)]
    pub covered_areas: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use mongodb::bson::{self, Bson};

    fn payment_dated(date: DateTime<Utc>, paid_date: Option<DateTime<Utc>>) -> PaymentDoc {
        PaymentDoc {
            id: None,
            buyer_email: "buyer@example.com".to_string(),
            transaction_id: None,
            total_price: 100.0,
            status: "paid".to_string(),
            date,
            paid_date,
            cart_items: vec![],
        }
    }

    #[test]
    fn payment_dates_store_as_native_bson_datetimes() {
        let midnight = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let payment = payment_dated(midnight + Duration::milliseconds(123), Some(midnight));

        let doc = bson::to_document(&payment).unwrap();
        assert!(matches!(doc.get("date"), Some(Bson::DateTime(_))));
        assert!(matches!(doc.get("paidDate"), Some(Bson::DateTime(_))));

        // A sale 123 ms into the day must not fall below a whole-second
        // start-of-day bound; native datetimes compare by millis, strings
        // would compare '.' against 'Z' and drop it.
        let stored = doc.get_datetime("date").unwrap();
        assert!(*stored >= bson::DateTime::from_chrono(midnight));
        assert_eq!(stored.to_chrono(), midnight + Duration::milliseconds(123));
    }

    #[test]
    fn optional_dates_may_be_absent_and_roundtrip() {
        let unpaid = payment_dated(Utc::now(), None);
        let doc = bson::to_document(&unpaid).unwrap();
        assert!(!doc.contains_key("paidDate"));

        let back: PaymentDoc = bson::from_document(doc).unwrap();
        assert!(back.paid_date.is_none());
    }
}
