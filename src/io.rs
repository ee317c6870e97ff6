//! File I/O for the command-line tools.
//!
//! * safetensors reader: sEEG series (`data` + optional `ch_names`) and
//!   decoding datasets (`x`, `y`).
//! * safetensors writer ([`StWriter`]).
//! * JSON annotation tables (array of flat records) → [`AnnotationTable`].
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2};
use std::collections::HashMap;
use std::path::Path;

use crate::anatomy::AnnotationTable;

// ── Low-level safetensors parser (raw bytes → ndarray, no tensor crate) ──────

type Header = HashMap<String, serde_json::Value>;

fn parse_header(bytes: &[u8]) -> Result<(Header, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let end = usize::try_from(u64::from_le_bytes(len))
        .ok()
        .and_then(|n| n.checked_add(8))
        .context("safetensors header length overflows")?;
    let body = bytes
        .get(8..end)
        .context("safetensors header runs past the end of the file")?;
    let header: Header =
        serde_json::from_slice(body).context("failed to parse safetensors header")?;
    Ok((header, end))
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry has no shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect()
}

fn raw_bytes<'a>(bytes: &'a [u8], data_start: usize, entry: &serde_json::Value) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"].as_array().context("tensor entry has no offsets")?;
    let (s, e) = match (offsets.first().and_then(|v| v.as_u64()), offsets.get(1).and_then(|v| v.as_u64())) {
        (Some(s), Some(e)) => (s as usize, e as usize),
        _ => bail!("malformed data_offsets"),
    };
    let start = data_start.checked_add(s).context("tensor offset overflows")?;
    let end = data_start.checked_add(e).context("tensor offset overflows")?;
    bytes
        .get(start..end)
        .context("tensor data runs past the end of the file")
}

/// Any numeric tensor widened to `f64`, with its shape.
fn read_f64_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<(Vec<f64>, Vec<usize>)> {
    let raw = raw_bytes(bytes, data_start, entry)?;
    let values: Vec<f64> = match entry["dtype"].as_str().unwrap_or_default() {
        "F64" => raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        "F32" => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "I64" => raw
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64)
            .collect(),
        "I32" => raw
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        other => bail!("unsupported tensor dtype {other:?}"),
    };
    Ok((values, shape_of(entry)?))
}

fn read_matrix(bytes: &[u8], data_start: usize, header: &Header, key: &str) -> Result<Array2<f64>> {
    let entry = header.get(key).with_context(|| format!("missing '{key}' key"))?;
    let (values, shape) = read_f64_tensor(bytes, data_start, entry)?;
    match shape[..] {
        [r, c] => Ok(Array2::from_shape_vec((r, c), values)?),
        _ => bail!("'{key}' must be 2-D, got shape {shape:?}"),
    }
}

// ── Public structs ────────────────────────────────────────────────────────────

/// One sEEG recording: `data` is `[C, T]`.
#[derive(Debug, Clone)]
pub struct SeriesData {
    pub data: Array2<f64>,
    /// Channel names (empty if not saved).
    pub ch_names: Vec<String>,
}

impl SeriesData {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;
        let data = read_matrix(&bytes, data_start, &header, "data")?;

        // Channel names are optional: newline-separated UTF-8.
        let ch_names = match header.get("ch_names") {
            Some(e) => std::str::from_utf8(raw_bytes(&bytes, data_start, e)?)?
                .split('\n')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => vec![],
        };
        if !ch_names.is_empty() && ch_names.len() != data.nrows() {
            bail!("{} channel names for {} channels", ch_names.len(), data.nrows());
        }
        Ok(Self { data, ch_names })
    }
}

/// Features `x` (`[N, M]`) and integer labels `y` (`[N]`).
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<i64>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;
        let x = read_matrix(&bytes, data_start, &header, "x")?;
        let entry = header.get("y").context("missing 'y' key")?;
        let (values, _) = read_f64_tensor(&bytes, data_start, entry)?;
        let y = values.iter().map(|&v| v.round() as i64).collect();
        Ok(Self { x, y })
    }
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors file writer for F32, F64, I32 and U8 tensors.
///
/// ```rust,no_run
/// use ieegconn::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("gc", &[0.1, 0.2, 0.0], &[1, 3]);
/// w.add_strings("ch_names", &["A1", "A2"]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    /// Index matrix stored as I32.
    pub fn add_index_arr2(&mut self, name: &str, arr: &Array2<usize>) {
        let data: Vec<i32> = arr.iter().map(|&v| v as i32).collect();
        self.add_i32(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_u8(&mut self, name: &str, data: &[u8], shape: &[usize]) {
        self.entries.push((name.to_string(), data.to_vec(), "U8", shape.to_vec()));
    }

    /// Boolean mask stored as U8 (1 = true).
    pub fn add_bool_arr2(&mut self, name: &str, arr: &Array2<bool>) {
        let data: Vec<u8> = arr.iter().map(|&b| u8::from(b)).collect();
        self.add_u8(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    /// Newline-separated UTF-8, the layout [`SeriesData::load`] reads back.
    pub fn add_strings<S: AsRef<str>>(&mut self, name: &str, items: &[S]) {
        let joined = items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n");
        let bytes = joined.into_bytes();
        let len = bytes.len();
        self.add_u8(name, &bytes, &[len]);
    }

    /// JSON header padded with spaces to a multiple of 8 bytes.
    fn header(&self) -> Result<Vec<u8>> {
        let mut offset = 0usize;
        let mut meta = serde_json::Map::new();
        for (name, bytes, dtype, shape) in &self.entries {
            let end = offset + bytes.len();
            meta.insert(
                name.clone(),
                serde_json::json!({ "dtype": dtype, "shape": shape, "data_offsets": [offset, end] }),
            );
            offset = end;
        }
        let mut header = serde_json::to_vec(&meta)?;
        header.resize(header.len().next_multiple_of(8), b' ');
        Ok(header)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let header = self.header()?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        out.write_all(&(header.len() as u64).to_le_bytes())?;
        out.write_all(&header)?;
        for (_, bytes, _, _) in &self.entries {
            out.write_all(bytes)?;
        }
        out.flush()
            .with_context(|| format!("writing {}", path.display()))
    }
}

// ── Annotation tables ─────────────────────────────────────────────────────────

/// Parse a JSON array of flat records into an [`AnnotationTable`].
///
/// Values are stringified (`null` → empty string); a key missing from a
/// record is empty in that row. Columns are looked up by name.
pub fn parse_annotation_json(text: &str) -> crate::error::Result<AnnotationTable> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(text)?;
    let mut names: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }
    let columns = names.into_iter().map(|name| {
        let values: Vec<String> = records
            .iter()
            .map(|r| match r.get(&name) {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        (name, values)
    });
    AnnotationTable::from_columns(columns)
}

pub fn load_annotation_json(path: &Path) -> crate::error::Result<AnnotationTable> {
    parse_annotation_json(&std::fs::read_to_string(path)?)
}
