// src/store/mod.rs
//! The key-indexed store: five maps built once by concurrent loaders,
//! read-only afterward.
//!
//! `Store::load` is the readiness gate. A `Store` value only exists
//! after every dataset fetched and indexed successfully, so queries
//! against a partially built store are unrepresentable.

use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::fetch::fetch_text;
use crate::parse::{detect_delimiter, non_empty_lines, split_line};
use crate::schema::{Row, SchemaSet, TableSchema};

#[derive(Debug)]
pub struct Store {
    schemas: SchemaSet,
    ip_by_code: HashMap<String, String>,
    cells_by_code: HashMap<String, Vec<Row>>,
    config_by_code: HashMap<String, Vec<Row>>,
    antenna_by_key: HashMap<String, Vec<Row>>,
    optical_by_key: HashMap<String, Vec<Row>>,
}

impl Store {
    /// Fetch and index all five datasets.
    ///
    /// The fetches run as concurrent tasks and are awaited jointly; the
    /// first failure aborts the whole load. Retrying means calling
    /// `load` again from scratch.
    #[instrument(level = "info", skip(client, schemas))]
    pub async fn load(client: &Client, base: &str, schemas: SchemaSet) -> Result<Store> {
        let sites = spawn_fetch(client, base, schemas.sites.file.clone());
        let lncel = spawn_fetch(client, base, schemas.lncel.file.clone());
        let config_2g = spawn_fetch(client, base, schemas.config_2g.file.clone());
        let ant_4g = spawn_fetch(client, base, schemas.ant_4g.file.clone());
        let opt_speed = spawn_fetch(client, base, schemas.opt_speed.file.clone());

        let store = Store::from_texts(
            schemas,
            &sites.await??,
            &lncel.await??,
            &config_2g.await??,
            &ant_4g.await??,
            &opt_speed.await??,
        );
        info!(
            sites = store.ip_by_code.len(),
            cells = store.cells_by_code.len(),
            config_2g = store.config_by_code.len(),
            antennas = store.antenna_by_key.len(),
            optical = store.optical_by_key.len(),
            "store ready"
        );
        Ok(store)
    }

    /// Index already-fetched dataset texts. Useful when the caller has
    /// its own transport; `load` is this plus the fetches.
    pub fn from_texts(
        schemas: SchemaSet,
        sites: &str,
        lncel: &str,
        config_2g: &str,
        ant_4g: &str,
        opt_speed: &str,
    ) -> Store {
        Store {
            ip_by_code: index_single(sites, &schemas.sites, "ip"),
            cells_by_code: index_rows(lncel, &schemas.lncel),
            config_by_code: index_rows(config_2g, &schemas.config_2g),
            antenna_by_key: index_rows(ant_4g, &schemas.ant_4g),
            optical_by_key: index_rows(opt_speed, &schemas.opt_speed),
            schemas,
        }
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    /// Raw IP cell for a site code, if any.
    pub fn ip(&self, code: &str) -> Option<&str> {
        self.ip_by_code.get(code).map(String::as_str)
    }

    /// LNCEL rows for a site code, in source order.
    pub fn cells(&self, code: &str) -> &[Row] {
        self.cells_by_code.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 2G config rows for a site code, in source order.
    pub fn config(&self, code: &str) -> &[Row] {
        self.config_by_code.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 4G antenna rows for a derived antenna-key.
    pub fn antenna(&self, key: &str) -> &[Row] {
        self.antenna_by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Optical transceiver rows for a port identifier.
    pub fn optical(&self, key: &str) -> &[Row] {
        self.optical_by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn spawn_fetch(client: &Client, base: &str, name: String) -> JoinHandle<Result<String>> {
    let client = client.clone();
    let base = base.to_string();
    tokio::spawn(async move {
        fetch_text(&client, &base, &name)
            .await
            .with_context(|| format!("loading {}", name))
    })
}

/// Key → last value seen, for the one-to-one sites dataset.
fn index_single(text: &str, schema: &TableSchema, column: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut lines = non_empty_lines(text);
    let header = match lines.next() {
        Some(h) => h,
        None => return map,
    };
    let delimiter = detect_delimiter(header);

    for line in lines {
        let fields = split_line(line, delimiter);
        if let Some((key, row)) = schema.extract(&fields) {
            let value = row.get(schema, column);
            // Rows with an empty value cell are skipped, they do not
            // clobber an earlier good value for the same key.
            if !value.is_empty() {
                map.insert(key, value.to_string());
            }
        }
    }
    map
}

/// Key → ordered row list, for the one-to-many datasets.
fn index_rows(text: &str, schema: &TableSchema) -> HashMap<String, Vec<Row>> {
    let mut map: HashMap<String, Vec<Row>> = HashMap::new();
    let mut lines = non_empty_lines(text);
    let header = match lines.next() {
        Some(h) => h,
        None => return map,
    };
    let delimiter = detect_delimiter(header);

    for line in lines {
        let fields = split_line(line, delimiter);
        if let Some((key, row)) = schema.extract(&fields) {
            map.entry(key).or_default().push(row);
        }
    }
    map
}
