//! Cart persistence
//!
//! The cart is mirrored to durable storage as a [`CartSnapshot`] after every mutation and
//! restored from it on start-up.

use std::{
    fs, io,
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cart::{CartItem, CartState},
    products::Product,
    uuids::{ProductUuid, ProductVariantUuid, ShopUuid},
};

/// Namespace used for the cart file when none is configured.
pub const DEFAULT_NAMESPACE: &str = "cart-storage";

/// Errors raised while loading or saving a cart snapshot.
#[derive(Debug, Error)]
pub enum CartStorageError {
    /// Reading or writing the backing file failed.
    #[error("cart storage io error: {0}")]
    Io(#[from] io::Error),

    /// The stored snapshot is not valid JSON for a cart.
    #[error("cart snapshot is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The snapshot was priced in a different currency than the store.
    #[error("cart snapshot is in {found}, expected {expected}")]
    CurrencyMismatch {
        /// Currency the store runs in
        expected: &'static str,

        /// Currency recorded in the snapshot
        found: String,
    },

    /// Another thread panicked while holding the in-memory storage lock.
    #[error("in-memory cart storage lock was poisoned")]
    Poisoned,
}

impl From<tempfile::PersistError> for CartStorageError {
    fn from(err: tempfile::PersistError) -> Self {
        Self::Io(err.error)
    }
}

/// Serialisable form of the cart state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// ISO code of the currency every price is recorded in.
    pub currency: String,

    /// Whether the cart panel was open.
    pub open: bool,

    /// Line items in display order.
    pub items: Vec<CartItemSnapshot>,
}

/// Serialisable form of a single line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemSnapshot {
    /// Product identity
    pub product: ProductUuid,

    /// Variant identity, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<ProductVariantUuid>,

    /// Product name
    pub name: String,

    /// Unit price in minor units
    pub price_minor: i64,

    /// Product image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Shop selling the product
    pub shop: ShopUuid,

    /// Shipping weight of one unit, in grams
    #[serde(default)]
    pub weight_grams: u32,

    /// Quantity in the cart
    pub quantity: NonZeroU32,
}

impl CartSnapshot {
    /// Capture a cart state.
    pub fn capture(state: &CartState<'_>, currency: &Currency) -> Self {
        Self {
            currency: currency.iso_alpha_code.to_string(),
            open: state.is_open(),
            items: state
                .items()
                .iter()
                .map(|item| {
                    let product = item.product();

                    CartItemSnapshot {
                        product: product.uuid,
                        variant: product.variant,
                        name: product.name.clone(),
                        price_minor: product.price.to_minor_units(),
                        image: product.image.clone(),
                        shop: product.shop,
                        weight_grams: product.weight_grams,
                        quantity: item.quantity(),
                    }
                })
                .collect(),
        }
    }

    /// Rebuild the cart state, priced in `currency`.
    ///
    /// Duplicate product entries are merged by summing their quantities so the restored
    /// cart keeps one line per product.
    ///
    /// # Errors
    ///
    /// Returns [`CartStorageError::CurrencyMismatch`] if the snapshot was recorded in a
    /// different currency.
    pub fn restore(
        self,
        currency: &'static Currency,
    ) -> Result<CartState<'static>, CartStorageError> {
        if self.currency != currency.iso_alpha_code {
            return Err(CartStorageError::CurrencyMismatch {
                expected: currency.iso_alpha_code,
                found: self.currency,
            });
        }

        let mut items: Vec<CartItem<'static>> = Vec::with_capacity(self.items.len());

        for entry in self.items {
            if let Some(existing) = items
                .iter_mut()
                .find(|item| item.product_uuid() == entry.product)
            {
                existing.quantity = existing.quantity.saturating_add(entry.quantity.get());
                continue;
            }

            let product = Product {
                uuid: entry.product,
                variant: entry.variant,
                name: entry.name,
                price: Money::from_minor(entry.price_minor, currency),
                image: entry.image,
                shop: entry.shop,
                weight_grams: entry.weight_grams,
            };

            items.push(CartItem::with_quantity(product, entry.quantity));
        }

        Ok(CartState::new(items, self.open))
    }
}

/// Durable storage for the cart.
pub trait CartPersistence {
    /// Load the last saved snapshot, `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns a [`CartStorageError`] if the storage cannot be read or decoded.
    fn load(&self) -> Result<Option<CartSnapshot>, CartStorageError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`CartStorageError`] if the snapshot cannot be written.
    fn save(&self, snapshot: &CartSnapshot) -> Result<(), CartStorageError>;
}

impl<P: CartPersistence + ?Sized> CartPersistence for &P {
    fn load(&self) -> Result<Option<CartSnapshot>, CartStorageError> {
        (**self).load()
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), CartStorageError> {
        (**self).save(snapshot)
    }
}

/// In-memory storage holding the serialised snapshot. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryCartStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with raw JSON, as if written by an earlier session.
    #[must_use]
    pub fn with_contents(json: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(json.into()))),
        }
    }

    /// Raw JSON currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`CartStorageError::Poisoned`] if the lock was poisoned.
    pub fn contents(&self) -> Result<Option<String>, CartStorageError> {
        let slot = self.slot.lock().map_err(|_err| CartStorageError::Poisoned)?;

        Ok(slot.clone())
    }
}

impl CartPersistence for MemoryCartStorage {
    fn load(&self) -> Result<Option<CartSnapshot>, CartStorageError> {
        self.contents()?
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CartStorageError::from)
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), CartStorageError> {
        let json = serde_json::to_string(snapshot)?;
        let mut slot = self.slot.lock().map_err(|_err| CartStorageError::Poisoned)?;

        *slot = Some(json);

        Ok(())
    }
}

/// One JSON file per namespace under a data directory.
///
/// Writes go to a temporary file in the same directory which is then renamed over the
/// target, so readers only ever see a complete snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileCartStorage {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonFileCartStorage {
    /// Storage for `namespace` under `dir`.
    pub fn new(dir: impl Into<PathBuf>, namespace: &str) -> Self {
        let dir = dir.into();
        let path = dir.join(format!("{namespace}.json"));

        Self { dir, path }
    }

    /// Storage for [`DEFAULT_NAMESPACE`] under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, DEFAULT_NAMESPACE)
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartPersistence for JsonFileCartStorage {
    fn load(&self) -> Result<Option<CartSnapshot>, CartStorageError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(serde_json::from_str(&json)?))
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), CartStorageError> {
        fs::create_dir_all(&self.dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;

        serde_json::to_writer_pretty(&mut file, snapshot)?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;

        Ok(())
    }
}
