//! Product codes and the static product registry.
//!
//! Every device reports a 4-character product code (for example `E052`) in
//! its dataflash. The registry maps those codes to a display name and to the
//! set of optional features the device supports.

use core::{fmt, str::FromStr};

use bitflags::bitflags;
use thiserror::Error;

use crate::{
    decode::{Decode, DecodeError},
    encode::Encode,
};

/// Name reported for empty or unrecognized product codes.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown device";

bitflags! {
    /// Optional features supported by a product.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct ProductFlags: u8 {
        /// The device accepts a boot logo upload.
        const LOGO = 1 << 0;
    }
}

/// An entry of the product registry.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Product {
    pub code: &'static str,
    pub name: &'static str,
    pub flags: ProductFlags,
}

impl Product {
    const fn new(code: &'static str, name: &'static str, flags: ProductFlags) -> Self {
        Self { code, name, flags }
    }

    pub const fn supports_logo_upload(&self) -> bool {
        self.flags.contains(ProductFlags::LOGO)
    }
}

const LOGO: ProductFlags = ProductFlags::LOGO;
const NONE: ProductFlags = ProductFlags::empty();

static PRODUCTS: &[Product] = &[
    Product::new("E043", "Joyetech eVic-VTwo", LOGO),
    Product::new("E052", "Joyetech eVic-VTC Mini", LOGO),
    Product::new("E056", "Joyetech CUBOID MINI", LOGO),
    Product::new("E060", "Joyetech Cuboid", LOGO),
    Product::new("E079", "Joyetech eVic-VTC Dual", LOGO),
    Product::new("E083", "Joyetech eGrip II", LOGO),
    Product::new("E092", "Joyetech eVic AIO", LOGO),
    Product::new("E115", "Joyetech eVic-VTwo Mini", LOGO),
    Product::new("E150", "Joyetech eVic Basic", LOGO),
    Product::new("M011", "Eleaf iStick TC100W", NONE),
    Product::new("M041", "Eleaf iStick Pico", NONE),
    Product::new("M045", "Eleaf iStick Pico Mega", NONE),
    Product::new("M046", "Eleaf iPower", NONE),
    Product::new("W007", "Wismec Presa TC75W", LOGO),
    Product::new("W010", "Vaporflask Classic", NONE),
    Product::new("W011", "Vaporflask Lite", NONE),
    Product::new("W013", "Vaporflask Stout", NONE),
    Product::new("W014", "Wismec Reuleaux RX200", NONE),
    Product::new("W016", "Wismec CB-60", LOGO),
    Product::new("W018", "Wismec Reuleaux RX2/3", LOGO),
    Product::new("W026", "Wismec Reuleaux RX75", LOGO),
    Product::new("W033", "Wismec Reuleaux RX200S", LOGO),
];

/// Returns every known product.
pub fn products() -> impl Iterator<Item = &'static Product> {
    PRODUCTS.iter()
}

/// Looks up a product by its 4-character code.
pub fn lookup(code: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|product| product.code == code)
}

/// Returns the display name for `code`, or [`UNKNOWN_DEVICE_NAME`].
pub fn display_name(code: &str) -> &'static str {
    lookup(code).map_or(UNKNOWN_DEVICE_NAME, |product| product.name)
}

/// Returns whether the product identified by `code` accepts a boot logo.
///
/// Unknown products never do.
pub fn supports_logo_upload(code: &str) -> bool {
    lookup(code).is_some_and(Product::supports_logo_upload)
}

/// A 4-byte ASCII product code as stored in the dataflash.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct ProductId([u8; 4]);

impl ProductId {
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Returns the code as a string, if the stored bytes are valid ASCII.
    pub fn as_str(&self) -> Option<&str> {
        if self.0.is_ascii() {
            core::str::from_utf8(&self.0).ok()
        } else {
            None
        }
    }

    pub fn product(&self) -> Option<&'static Product> {
        self.as_str().and_then(lookup)
    }

    pub fn name(&self) -> &'static str {
        self.as_str().map_or(UNKNOWN_DEVICE_NAME, display_name)
    }

    pub fn supports_logo_upload(&self) -> bool {
        self.as_str().is_some_and(supports_logo_upload)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            let c = if byte.is_ascii_graphic() { byte as char } else { '?' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("product codes are 4 ASCII characters")]
pub struct ProductIdError;

impl FromStr for ProductId {
    type Err = ProductIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s.as_bytes().try_into().map_err(|_| ProductIdError)?;
        if !bytes.is_ascii() {
            return Err(ProductIdError);
        }
        Ok(Self(bytes))
    }
}

impl Encode for ProductId {
    fn size(&self) -> usize {
        4
    }

    fn encode(&self, data: &mut [u8]) {
        self.0.encode(data)
    }
}

impl Decode for ProductId {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self(<[u8; 4]>::decode(data)?))
    }
}
