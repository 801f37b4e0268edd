//! Buyer and delivery details

use std::fmt;

use serde::{Deserialize, Serialize};

/// A required checkout field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutField {
    /// Recipient name
    RecipientName,
    /// Recipient phone
    Phone,
    /// Street address
    Address,
    /// Province
    Province,
    /// City
    City,
    /// District
    District,
    /// Postal code
    PostalCode,
    /// Guest buyer name
    GuestName,
    /// Guest buyer email
    GuestEmail,
    /// Guest buyer phone
    GuestPhone,
}

impl fmt::Display for CheckoutField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RecipientName => "recipient name",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Province => "province",
            Self::City => "city",
            Self::District => "district",
            Self::PostalCode => "postal code",
            Self::GuestName => "guest name",
            Self::GuestEmail => "guest email",
            Self::GuestPhone => "guest phone",
        };

        f.write_str(name)
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Where the order is delivered.
///
/// Missing fields decode as empty so a sparse address on a created transaction still reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    /// Person receiving the parcel
    pub recipient_name: String,

    /// Recipient phone
    pub phone: String,

    /// Street address
    pub address: String,

    /// Province
    pub province: String,

    /// City or regency
    pub city: String,

    /// District
    pub district: String,

    /// Postal code
    pub postal_code: String,
}

impl ShippingAddress {
    /// Required fields that are empty, in form order.
    pub fn missing_fields(&self) -> Vec<CheckoutField> {
        [
            (CheckoutField::RecipientName, &self.recipient_name),
            (CheckoutField::Phone, &self.phone),
            (CheckoutField::Address, &self.address),
            (CheckoutField::Province, &self.province),
            (CheckoutField::City, &self.city),
            (CheckoutField::District, &self.district),
            (CheckoutField::PostalCode, &self.postal_code),
        ]
        .into_iter()
        .filter_map(|(field, value)| blank(value).then_some(field))
        .collect()
    }
}

/// Contact details for a buyer without an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    /// Guest name
    #[serde(rename = "guest_name")]
    pub name: String,

    /// Guest email
    #[serde(rename = "guest_email")]
    pub email: String,

    /// Guest phone
    #[serde(rename = "guest_phone")]
    pub phone: String,
}

impl GuestDetails {
    /// Required fields that are empty, in form order.
    pub fn missing_fields(&self) -> Vec<CheckoutField> {
        [
            (CheckoutField::GuestName, &self.name),
            (CheckoutField::GuestEmail, &self.email),
            (CheckoutField::GuestPhone, &self.phone),
        ]
        .into_iter()
        .filter_map(|(field, value)| blank(value).then_some(field))
        .collect()
    }

    /// Whether the email looks deliverable: something on both sides of an `@`.
    pub fn has_valid_email(&self) -> bool {
        self.email
            .trim()
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
    }
}

/// Everything the buyer types into the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutDetails {
    /// Delivery address
    pub address: ShippingAddress,

    /// Guest contact details, only used by guest checkout
    pub guest: GuestDetails,

    /// Free-form note for the sellers
    pub note: Option<String>,
}
