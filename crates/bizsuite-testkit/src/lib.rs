// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod fake_source;

pub use fake_source::{FakeSource, Recorded};

use bizsuite_app::LookupItem;

const PRODUCTS: [&str; 14] = [
    "Blood Tubing Set",
    "Dialyser",
    "AV Fistula Needle",
    "Bicarbonate Cartridge",
    "Catheter Kit",
    "Surgical Gloves",
    "Transducer Protector",
    "Saline Bag",
    "Syringe",
    "Gauze Roll",
    "Heparin Vial",
    "Dressing Pack",
    "Citos Equipment",
    "Spare Components Kit",
];

const GRADES: [&str; 6] = ["Standard", "Premium", "High Flux", "Low Flux", "Pediatric", "Sterile"];
const SIZES: [&str; 5] = ["Small", "Medium", "Large", "15G", "17G"];
const TAX_SLABS: [f64; 4] = [0.0, 5.0, 12.0, 18.0];

const CLIENTS: [&str; 8] = [
    "City Hospital",
    "Regional Hospital",
    "Health Clinic",
    "Community Health Center",
    "Metro Dialysis Centre",
    "Sunrise Nursing Home",
    "Lakeside Medical",
    "Hope Kidney Care",
];

const SUPPLIERS: [&str; 6] = [
    "Medical Supplies Co.",
    "Healthcare Distributors",
    "Renal Devices Ltd",
    "Sterile Goods Traders",
    "Pharma Wholesale",
    "Care Equipment House",
];

const EMPLOYEES: [&str; 6] = [
    "Avery Walker",
    "Jordan Martin",
    "Taylor Hill",
    "Riley Evans",
    "Morgan Lopez",
    "Casey Gray",
];

pub fn clients() -> Vec<LookupItem> {
    named("c", &CLIENTS)
}

pub fn suppliers() -> Vec<LookupItem> {
    named("s", &SUPPLIERS)
}

pub fn employees() -> Vec<LookupItem> {
    named("e", &EMPLOYEES)
}

fn named(prefix: &str, names: &[&str]) -> Vec<LookupItem> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| LookupItem::new(format!("{prefix}{}", index + 1), *name))
        .collect()
}

/// A small, hand-picked inventory with prices and tax rates.
pub fn inventory() -> Vec<LookupItem> {
    [
        ("i1", "Blood Tubing Set Premium", 100.0, 18.0),
        ("i2", "Dialyser F8 High Flux", 850.0, 12.0),
        ("i3", "AV Fistula Needle 15G", 35.0, 12.0),
        ("i4", "Bicarbonate Cartridge", 420.0, 5.0),
        ("i5", "Surgical Gloves Sterile", 12.5, 0.0),
        ("i6", "Citos Equipment Standard", 2400.0, 18.0),
        ("i7", "Spare Components Kit", 640.0, 18.0),
        ("i8", "Needle Holder", 75.0, 12.0),
    ]
    .into_iter()
    .map(|(id, name, rate, tax)| {
        LookupItem::new(id, name)
            .with_extra("rate", rate)
            .with_extra("tax_percent", tax)
    })
    .collect()
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1) ^ 0x2545_F491_4F6C_DD1D,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn pick<'a, T>(&mut self, values: &'a [T]) -> &'a T {
        let index = (self.next_u64() % values.len() as u64) as usize;
        &values[index]
    }
}

/// Generates large, reproducible inventories for exercising caps and
/// ranking over realistic catalogs.
#[derive(Debug, Clone)]
pub struct CatalogFaker {
    rng: DeterministicRng,
}

impl CatalogFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(seed),
        }
    }

    pub fn inventory(&mut self, count: usize) -> Vec<LookupItem> {
        (1..=count)
            .map(|index| {
                let product = *self.rng.pick(&PRODUCTS);
                let grade = *self.rng.pick(&GRADES);
                let size = *self.rng.pick(&SIZES);
                let tax = *self.rng.pick(&TAX_SLABS);
                let rate = (self.rng.next_u64() % 5_000 + 10) as f64;
                LookupItem::new(format!("gen{index}"), format!("{product} {grade} {size} #{index}"))
                    .with_extra("rate", rate)
                    .with_extra("tax_percent", tax)
            })
            .collect()
    }
}
