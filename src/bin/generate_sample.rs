use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const N_ASSEMBLIES: usize = 4;
const N_AXIAL: usize = 6;
const PINS: usize = 5;
const TIMES: [f64; 3] = [0.0, 100.0, 200.0];

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

/// Chopped-cosine axial shape times a radial bump peaking at the assembly
/// centre, with Gaussian noise.
fn pin_grid(assembly: usize, level: usize, time: f64, noise: f64, rng: &mut SimpleRng) -> Vec<f64> {
    let z = (level as f64 + 0.5) / N_AXIAL as f64;
    let axial = (std::f64::consts::PI * (z - 0.5) * 0.9).cos();
    let burnup = 1.0 - 0.0005 * time * (1.0 + assembly as f64 * 0.1);
    let centre = (PINS as f64 - 1.0) / 2.0;

    let mut values = Vec::with_capacity(PINS * PINS);
    for i in 0..PINS {
        for j in 0..PINS {
            let r2 = ((i as f64 - centre).powi(2) + (j as f64 - centre).powi(2)) / (centre * centre * 2.0);
            let radial = 1.1 - 0.2 * r2;
            values.push(axial * radial * burnup + rng.gauss(0.0, noise));
        }
    }
    values
}

#[derive(Default)]
struct Rows {
    time: Vec<f64>,
    feature: Vec<String>,
    rows: Vec<i64>,
    cols: Vec<i64>,
    values: Vec<Vec<f64>>,
}

impl Rows {
    fn push(&mut self, time: f64, feature: &str, rows: usize, cols: usize, values: Vec<f64>) {
        self.time.push(time);
        self.feature.push(feature.to_string());
        self.rows.push(rows as i64);
        self.cols.push(cols as i64);
        self.values.push(values);
    }
}

fn generate(seed: u64, noise: f64) -> Rows {
    let mut rng = SimpleRng::new(seed);
    let mut rows = Rows::default();
    for &time in &TIMES {
        rows.push(time, "assemblies", 1, 1, vec![N_ASSEMBLIES as f64]);
        for assembly in 0..N_ASSEMBLIES {
            for level in 0..N_AXIAL {
                rows.push(time, "power", PINS, PINS, pin_grid(assembly, level, time, noise, &mut rng));
            }
        }
    }
    rows
}

fn write_parquet(path: &Path, data: Rows) -> Result<usize> {
    let mut values_builder = ListBuilder::new(Float64Builder::new());
    for row in &data.values {
        let values = values_builder.values();
        for &v in row {
            values.append_value(v);
        }
        values_builder.append(true);
    }
    let values_array = values_builder.finish();
    let n_rows = data.time.len();

    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Float64, false),
        Field::new("feature", DataType::Utf8, false),
        Field::new("rows", DataType::Int64, false),
        Field::new("cols", DataType::Int64, false),
        Field::new("values", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(data.time)),
            Arc::new(StringArray::from(data.feature)),
            Arc::new(Int64Array::from(data.rows)),
            Arc::new(Int64Array::from(data.cols)),
            Arc::new(values_array),
        ],
    )
    .context("Failed to create RecordBatch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(n_rows)
}

fn main() -> Result<()> {
    // Same physics, different noise: the reference plays the "measured" core.
    for (path, seed, noise) in [("core_primary.parquet", 42, 0.01), ("core_reference.parquet", 7, 0.02)] {
        let n = write_parquet(Path::new(path), generate(seed, noise))?;
        println!(
            "Wrote {n} matrices ({} time steps, {N_ASSEMBLIES} assemblies x {N_AXIAL} levels of {PINS}x{PINS}) to {path}",
            TIMES.len()
        );
    }
    Ok(())
}
