/// Shared helpers: seeded synthetic signals and a raw safetensors reader.
use ndarray::{Array, Array1, Array2, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[allow(unused)]
/// Scratch file path unique to one test.
pub fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ieegconn-{}-{name}", std::process::id()))
}

#[allow(unused)]
/// Independent uniform noise in [-1, 1), shape `[n_sources, n_samples]`.
pub fn white_noise(n_sources: usize, n_samples: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((n_sources, n_samples), |_| rng.gen_range(-1.0..1.0))
}

#[allow(unused)]
/// Source 0 is noise, source 1 repeats it one sample later plus `gain` noise.
pub fn driven_pair(n_samples: usize, gain: f64, seed: u64) -> Array2<f64> {
    let noise = white_noise(2, n_samples, seed);
    let mut x = Array2::zeros((2, n_samples));
    for t in 0..n_samples {
        x[[0, t]] = noise[[0, t]];
        let past = if t > 0 { noise[[0, t - 1]] } else { 0.0 };
        x[[1, t]] = past + gain * noise[[1, t]];
    }
    x
}

#[allow(unused)]
/// Two-class dataset: `n_per_class` trials per class, `n_features` columns.
/// Column 0 separates the classes by `shift`; the others are pure noise.
pub fn two_class_dataset(
    n_per_class: usize,
    n_features: usize,
    shift: f64,
    seed: u64,
) -> (Array2<f64>, Array1<i64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = 2 * n_per_class;
    let y = Array1::from_iter((0..n).map(|i| (i / n_per_class) as i64));
    let x = Array2::from_shape_fn((n, n_features), |(i, j)| {
        let noise: f64 = rng.gen_range(-0.5..0.5);
        if j == 0 { noise + shift * y[i] as f64 } else { noise }
    });
    (x, y)
}

#[allow(unused)]
/// Load all numeric tensors of a safetensors file converted to f64.
/// Handles F32, F64, I32, I64, U8.
pub fn load_tensors_f64(path: &Path) -> HashMap<String, Array<f64, IxDyn>> {
    let bytes = std::fs::read(path)
        .unwrap_or_else(|_| panic!("tensor file not found: {}", path.display()));

    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    let header: serde_json::Value = serde_json::from_slice(&bytes[8..8 + n]).unwrap();
    let data_start = 8 + n;

    let mut out = HashMap::new();
    for (key, val) in header.as_object().unwrap() {
        if key == "__metadata__" { continue; }
        let dtype = val["dtype"].as_str().unwrap();
        let offsets = val["data_offsets"].as_array().unwrap();
        let s = offsets[0].as_u64().unwrap() as usize;
        let e = offsets[1].as_u64().unwrap() as usize;
        let raw = &bytes[data_start + s..data_start + e];
        let shape: Vec<usize> = val["shape"].as_array().unwrap()
            .iter().map(|v| v.as_u64().unwrap() as usize).collect();

        let vals: Vec<f64> = match dtype {
            "F32" => raw.chunks_exact(4)
                .map(|b| f32::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            "F64" => raw.chunks_exact(8)
                .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
                .collect(),
            "I32" => raw.chunks_exact(4)
                .map(|b| i32::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            "I64" => raw.chunks_exact(8)
                .map(|b| i64::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            "U8"  => raw.iter().map(|&b| b as f64).collect(),
            _ => continue,
        };

        let arr = Array::from_shape_vec(IxDyn(&shape), vals).unwrap();
        out.insert(key.clone(), arr);
    }
    out
}

#[allow(unused)]
/// Maximum absolute difference between two arrays.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}
