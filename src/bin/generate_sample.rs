use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// One output row, named like the columns the dashboard reads.
#[derive(Debug, Serialize)]
struct Row {
    referencia: NaiveDate,
    ano: i32,
    ipca_variacao: f64,
    inpc_variacao: f64,
    ipca15_variacao: f64,
    ipca_acumulado_doze_meses: f64,
    selic_meta: f64,
    salario_minimo: f64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).with_context(|| format!("invalid month {year}-{month}"))
}

/// Monthly rows from 2003 to 2024. Twelve warm-up months seed the trailing
/// window so the first written row already has a full 12-month figure.
fn generate(rng: &mut SimpleRng) -> Result<Vec<Row>> {
    let mut window: VecDeque<f64> = VecDeque::with_capacity(12);
    let mut prev_ipca: f64 = 0.4;
    let mut selic: f64 = 25.0;
    let mut wage: f64 = 240.0;
    let mut rows = Vec::new();

    for year in 2002..=2024 {
        for month in 1..=12u32 {
            // Early-year months run hotter (school fees, transport fares).
            let seasonal = if month <= 2 { 0.25 } else { 0.0 };
            let ipca = rng.gauss(0.38 + seasonal, 0.22);
            let inpc = ipca + rng.gauss(0.0, 0.08);
            let ipca15 = 0.5 * prev_ipca + 0.5 * ipca + rng.gauss(0.0, 0.05);
            prev_ipca = ipca;

            if window.len() == 12 {
                window.pop_front();
            }
            window.push_back(ipca);
            let ipca_12m: f64 = window.iter().sum();

            // The policy rate chases inflation plus a real-rate cushion.
            let target = (ipca_12m + 5.0).clamp(2.0, 26.5);
            let step = if (target - selic).abs() > 1.0 { 0.5 } else { 0.25 };
            if (target - selic).abs() > 0.25 {
                selic += step * (target - selic).signum();
            }

            if month == 1 && year > 2002 {
                // Yearly readjustment: last year's inflation plus real gain.
                wage = (wage * (1.0 + (ipca_12m + 2.0) / 100.0)).round();
            }

            if year < 2003 {
                continue;
            }
            let referencia = first_of_month(year, month)?;
            rows.push(Row {
                referencia,
                ano: referencia.year(),
                ipca_variacao: round2(ipca),
                inpc_variacao: round2(inpc),
                ipca15_variacao: round2(ipca15),
                ipca_acumulado_doze_meses: round2(ipca_12m),
                selic_meta: selic,
                salario_minimo: wage,
            });
        }
    }
    Ok(rows)
}

fn write_csv(path: &str, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &str, rows: &[Row]) -> Result<()> {
    let epoch = first_of_month(1970, 1)?;
    let float_col = |f: fn(&Row) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(rows.iter().map(f)))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("referencia", DataType::Date32, false),
        Field::new("ano", DataType::Int64, false),
        Field::new("ipca_variacao", DataType::Float64, false),
        Field::new("inpc_variacao", DataType::Float64, false),
        Field::new("ipca15_variacao", DataType::Float64, false),
        Field::new("ipca_acumulado_doze_meses", DataType::Float64, false),
        Field::new("selic_meta", DataType::Float64, false),
        Field::new("salario_minimo", DataType::Float64, false),
    ]));

    let dates: ArrayRef = Arc::new(Date32Array::from_iter_values(
        rows.iter().map(|r| (r.referencia - epoch).num_days() as i32),
    ));
    let years: ArrayRef = Arc::new(Int64Array::from_iter_values(
        rows.iter().map(|r| i64::from(r.ano)),
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            dates,
            years,
            float_col(|r| r.ipca_variacao),
            float_col(|r| r.inpc_variacao),
            float_col(|r| r.ipca15_variacao),
            float_col(|r| r.ipca_acumulado_doze_meses),
            float_col(|r| r.selic_meta),
            float_col(|r| r.salario_minimo),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng)?;

    write_csv("inflacao.csv", &rows)?;
    write_parquet("inflacao.parquet", &rows)?;

    println!(
        "Wrote {} months ({} to {}) to inflacao.csv and inflacao.parquet",
        rows.len(),
        rows.first().map(|r| r.referencia.to_string()).unwrap_or_default(),
        rows.last().map(|r| r.referencia.to_string()).unwrap_or_default(),
    );
    Ok(())
}
