// 🌱 Seed data - synthetic brand documents for development and tests
//
// Not part of the migration itself. Generates schema-plausible documents and,
// with drift enabled, rewrites some of them into the legacy shapes the
// migration has to repair.

use crate::db::SqliteBrandStore;
use crate::error::StorageResult;
use crate::schema::{BrandSchema, CanonicalField, LEGACY_CONTAINER_KEY};
use crate::shape::{HQ_ADDRESS_KEY, YEARS_FOUNDED_KEY, YEAR_CREATED_KEY};
use serde_json::{json, Map, Value};

pub const MAX_SITE_COUNT: i64 = 10_000;

const ADJECTIVES: &[&str] = &[
    "Ergonomic",
    "Rustic",
    "Sleek",
    "Handcrafted",
    "Refined",
    "Intelligent",
    "Gorgeous",
    "Practical",
    "Licensed",
    "Generic",
    "Fantastic",
    "Small",
];

const MATERIALS: &[&str] = &[
    "Steel",
    "Wooden",
    "Cotton",
    "Granite",
    "Bronze",
    "Rubber",
    "Frozen",
    "Plastic",
    "Concrete",
    "Marble",
];

const PRODUCTS: &[&str] = &[
    "Chair",
    "Car",
    "Computer",
    "Keyboard",
    "Shoes",
    "Hat",
    "Table",
    "Gloves",
    "Bike",
    "Towels",
    "Soap",
    "Lamp",
];

const CITIES: &[&str] = &[
    "Lake Avery",
    "Port Elsie",
    "North Dario",
    "South Kaelyn",
    "East Marisol",
    "West Tobin",
    "New Orville",
    "Fort Hollis",
    "Bradenport",
    "Kuhicside",
    "Millsberg",
    "Greenfelder",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    pub count: usize,
    /// Rewrite roughly half of the documents into legacy shapes
    pub drift: bool,
    /// Fixed seed for reproducible output; random when `None`
    pub seed: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            count: 10,
            drift: false,
            seed: None,
        }
    }
}

/// xorshift64 generator. Plenty for fixture data, not for anything secret.
pub struct Seeder {
    state: u64,
    min_year: i64,
    max_year: i64,
}

impl Seeder {
    pub fn new(seed: Option<u64>, schema: &BrandSchema) -> Self {
        let seed = seed.unwrap_or_else(|| uuid::Uuid::new_v4().as_u128() as u64);
        // xorshift never leaves the all-zero state
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Seeder {
            state,
            min_year: schema.min_founding_year(),
            max_year: schema.current_year(),
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

    /// Uniform integer in `[min, max]`
    pub fn int_in(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min) as u64 + 1;
        min + (self.next_u64() % span) as i64
    }

    fn pick<'s>(&mut self, items: &[&'s str]) -> &'s str {
        items[self.int_in(0, items.len() as i64 - 1) as usize]
    }

    pub fn product_name(&mut self) -> String {
        format!(
            "{} {} {}",
            self.pick(ADJECTIVES),
            self.pick(MATERIALS),
            self.pick(PRODUCTS)
        )
    }

    pub fn city(&mut self) -> String {
        self.pick(CITIES).to_string()
    }

    /// A document already in canonical shape
    pub fn canonical_document(&mut self) -> Map<String, Value> {
        let mut document = Map::new();
        document.insert(CanonicalField::Name.key().to_string(), json!(self.product_name()));
        document.insert(CanonicalField::Location.key().to_string(), json!(self.city()));
        document.insert(
            CanonicalField::FoundingYear.key().to_string(),
            json!(self.int_in(self.min_year, self.max_year)),
        );
        document.insert(
            CanonicalField::SiteCount.key().to_string(),
            json!(self.int_in(1, MAX_SITE_COUNT)),
        );
        document
    }

    /// Rewrite a canonical document into one of the known legacy shapes
    pub fn drift(&mut self, mut document: Map<String, Value>) -> Map<String, Value> {
        let name_key = CanonicalField::Name.key();
        let location_key = CanonicalField::Location.key();
        let year_key = CanonicalField::FoundingYear.key();
        let sites_key = CanonicalField::SiteCount.key();

        match self.int_in(0, 3) {
            0 => {
                if let Some(name) = document.remove(name_key) {
                    document.insert(LEGACY_CONTAINER_KEY.to_string(), json!({ "name": name }));
                }
                if let Some(location) = document.remove(location_key) {
                    document.insert(HQ_ADDRESS_KEY.to_string(), location);
                }
            }
            1 => {
                if let Some(year) = document.remove(year_key) {
                    document.insert(YEARS_FOUNDED_KEY.to_string(), json!(year.to_string()));
                }
                document.insert(sites_key.to_string(), json!("0"));
            }
            2 => {
                if let Some(year) = document.insert(year_key.to_string(), json!(0)) {
                    document.insert(YEAR_CREATED_KEY.to_string(), year);
                }
                let code = format!("L-{}", self.int_in(100, 999));
                document.insert("legacyCode".to_string(), json!(code));
            }
            _ => {
                let name = document.get(name_key).cloned().unwrap_or(Value::Null);
                document.insert(LEGACY_CONTAINER_KEY.to_string(), json!({ "name": name }));
                document.remove(sites_key);
            }
        }

        document
    }

    pub fn generate(&mut self, options: &SeedOptions) -> Vec<Map<String, Value>> {
        (0..options.count)
            .map(|_| {
                let document = self.canonical_document();
                if options.drift && self.int_in(0, 1) == 1 {
                    self.drift(document)
                } else {
                    document
                }
            })
            .collect()
    }
}

/// Generate documents and insert them as-is. Returns the new ids.
pub fn seed_store(
    store: &SqliteBrandStore,
    schema: &BrandSchema,
    options: &SeedOptions,
) -> StorageResult<Vec<String>> {
    let mut seeder = Seeder::new(options.seed, schema);
    let documents = seeder.generate(options);

    let tx = store.connection().unchecked_transaction()?;
    let ids = documents
        .iter()
        .map(|document| store.insert_raw(document))
        .collect::<StorageResult<Vec<_>>>()?;
    tx.commit()?;

    log::info!("seeded {} brand documents", ids.len());
    Ok(ids)
}
