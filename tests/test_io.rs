mod common;
use common::{load_tensors_f64, scratch_path};
use ieegconn::io::{load_annotation_json, Dataset, SeriesData, StWriter};
use ndarray::array;

#[test]
fn series_round_trip_with_channel_names() {
    let path = scratch_path("series.safetensors");
    let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let mut w = StWriter::new();
    w.add_f64_arr2("data", &data);
    w.add_strings("ch_names", &["A1", "A2"]);
    w.write(&path).unwrap();

    let rec = SeriesData::load(&path).unwrap();
    assert_eq!(rec.data, data);
    assert_eq!(rec.ch_names, vec!["A1", "A2"]);
    std::fs::remove_file(&path).ok();
}

#[test]
fn series_names_must_match_channels() {
    let path = scratch_path("bad-names.safetensors");
    let mut w = StWriter::new();
    w.add_f32("data", &[0.0; 6], &[2, 3]);
    w.add_strings("ch_names", &["A1"]);
    w.write(&path).unwrap();
    assert!(SeriesData::load(&path).is_err());
    std::fs::remove_file(&path).ok();
}

#[test]
fn dataset_accepts_integer_labels() {
    let path = scratch_path("dataset.safetensors");
    let mut w = StWriter::new();
    w.add_f32("x", &[0.5, 1.5, 2.5, 3.5], &[2, 2]);
    w.add_i32("y", &[3, 7], &[2]);
    w.write(&path).unwrap();

    let ds = Dataset::load(&path).unwrap();
    assert_eq!(ds.x, array![[0.5, 1.5], [2.5, 3.5]]);
    assert_eq!(ds.y.to_vec(), vec![3, 7]);
    std::fs::remove_file(&path).ok();
}

#[test]
fn writer_dtypes() {
    let path = scratch_path("dtypes.safetensors");
    let mut w = StWriter::new();
    w.add_bool_arr2("mask", &array![[true, false], [false, true]]);
    w.add_index_arr2("pairs", &array![[0usize, 1], [1, 2]]);
    w.write(&path).unwrap();

    let t = load_tensors_f64(&path);
    assert_eq!(t["mask"].shape(), &[2, 2]);
    assert_eq!(t["mask"].iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 0.0, 1.0]);
    assert_eq!(t["pairs"].iter().copied().collect::<Vec<_>>(), vec![0.0, 1.0, 1.0, 2.0]);
    std::fs::remove_file(&path).ok();
}

#[test]
fn annotation_file() {
    let path = scratch_path("annot.json");
    std::fs::write(&path, r#"[{"roi": "Hippo", "x": 1.5}, {"roi": "Amyg", "x": -2}]"#).unwrap();
    let table = load_annotation_json(&path).unwrap();
    assert_eq!(table.n_rows(), 2);
    assert_eq!(table.column("x").unwrap()[1], "-2");
    std::fs::remove_file(&path).ok();

    assert!(load_annotation_json(&scratch_path("missing.json")).is_err());
}
