// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates Kubernetes CRD YAML files from the Rust types defined in src/crd.rs, so that
//! test clusters can be prepared with exactly the schemas this library reads and writes.
//!
//! Usage:
//!   cargo run --bin crdgen [output-dir]
//!
//! Files are written to deploy/crds/ unless another directory is given.

use anyhow::{Context, Result};
use extension_lifecycle::crd::{DNSRecord, Extension, ShootState};
use kube::CustomResourceExt;
use std::fs;
use std::path::{Path, PathBuf};

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("deploy/crds"), PathBuf::from);

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<DNSRecord>("dnsrecords.crd.yaml", &output_dir)?;
    generate_crd::<Extension>("extensions.crd.yaml", &output_dir)?;
    generate_crd::<ShootState>("shootstates.crd.yaml", &output_dir)?;

    println!("✓ Successfully generated CRD YAML files in {}", output_dir.display());
    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<()>
where
    T: CustomResourceExt,
{
    let yaml = serde_yaml::to_string(&T::crd())
        .with_context(|| format!("failed to serialize {filename}"))?;
    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let output_path = output_dir.join(filename);
    fs::write(&output_path, content)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!("  ✓ Generated {filename}");
    Ok(())
}
