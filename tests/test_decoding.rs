mod common;
use common::two_class_dataset;
use ieegconn::decoding::{binomial_pvalue, chance_threshold, JobSplit};
use ieegconn::{ClassifierKind, ClassifierSpec, Classify, CvKind, CvSpec, FeatureMode, StatMethod};
use ndarray::{array, Array2};

fn cv(kind: CvKind) -> CvSpec {
    CvSpec { n_folds: 5, rep: 2, ..CvSpec::new(kind) }
}

#[test]
fn every_classifier_decodes_separable_classes() {
    let (x, y) = two_class_dataset(20, 2, 4.0, 42);
    for kind in ClassifierKind::ALL {
        let spec = ClassifierSpec { n_knn: 5, n_tree: 20, ..ClassifierSpec::new(kind) };
        let clf = Classify::new(&y, spec, cv(CvKind::StratifiedKFold)).unwrap();
        let da = clf.fit(&x, FeatureMode::Multi, 1).unwrap();
        assert_eq!(da.dim(), (1, 2));
        assert!(
            da.iter().all(|&v| v >= 95.0),
            "{kind}: accuracy {da:?}"
        );
    }
}

#[test]
fn single_feature_mode_scores_each_column() {
    let (x, y) = two_class_dataset(20, 3, 4.0, 1);
    let clf = Classify::new(&y, ClassifierSpec::default(), cv(CvKind::KFold)).unwrap();
    let da = clf.fit(&x, FeatureMode::Single, 2).unwrap();
    assert_eq!(da.dim(), (3, 2));
    assert!(da.row(0).iter().all(|&v| v >= 95.0));
    // Pure-noise columns stay far from perfect.
    assert!(da.row(1).iter().all(|&v| v < 90.0));
}

#[test]
fn every_cross_validation_runs() {
    let (x, y) = two_class_dataset(15, 1, 4.0, 9);
    for kind in [CvKind::StratifiedKFold, CvKind::KFold, CvKind::StratifiedShuffleSplit, CvKind::ShuffleSplit] {
        let clf = Classify::new(&y, ClassifierSpec::new(ClassifierKind::NaiveBayes), cv(kind)).unwrap();
        let da = clf.fit(&x, FeatureMode::Single, 1).unwrap();
        assert!(da.iter().all(|&v| v >= 90.0), "{kind}: {da:?}");
    }
}

#[test]
fn binomial_statistics() {
    let (x, y) = two_class_dataset(50, 1, 0.0, 3);
    let clf = Classify::new(&y, ClassifierSpec::default(), cv(CvKind::StratifiedKFold)).unwrap();
    let da = array![[50.0, 100.0]];
    let out = clf.stat(&x, &da, StatMethod::Binomial, 0, 1, 0).unwrap();
    assert_eq!(out.pvalue.dim(), (1, 2));
    assert!(out.pvalue[[0, 0]] > 0.05);
    assert!(out.pvalue[[0, 1]] < 1e-20);
    assert!(out.da_perm.is_none());

    let th = chance_threshold(100, 2, 0.01).unwrap();
    let p = binomial_pvalue(100, 2, &array![th - 1.0, th]).unwrap();
    assert!(p[0] > 0.01 && p[1] <= 0.01);
}

#[test]
fn permutation_methods_shape_and_significance() {
    let (x, y) = two_class_dataset(20, 2, 4.0, 5);
    let clf = Classify::new(&y, ClassifierSpec::default(), cv(CvKind::StratifiedKFold)).unwrap();
    let da = clf.fit(&x, FeatureMode::Single, 1).unwrap();
    let n_perm = 19;
    for method in [StatMethod::LabelShuffle, StatMethod::FullShuffle, StatMethod::IntraClassShuffle] {
        let out = clf.stat(&x, &da, method, n_perm, 2, 0).unwrap();
        assert_eq!(out.pvalue.dim(), (2, 1));
        let null = out.da_perm.expect("permutation methods return their null");
        assert_eq!(null.dim(), (2, n_perm));
        if method != StatMethod::IntraClassShuffle {
            // Informative column: no shuffle reaches the observed accuracy.
            assert!((out.pvalue[[0, 0]] - 1.0 / 20.0).abs() < 1e-12, "{method}: {:?}", out.pvalue);
        }
    }
}

#[test]
fn permutations_are_reproducible() {
    let (x, y) = two_class_dataset(12, 1, 1.0, 8);
    let clf = Classify::new(&y, ClassifierSpec::default(), cv(CvKind::KFold)).unwrap();
    let da = clf.fit(&x, FeatureMode::Multi, 1).unwrap();
    let a = clf.stat(&x, &da, StatMethod::LabelShuffle, 10, 1, 123).unwrap();
    let b = clf.stat(&x, &da, StatMethod::LabelShuffle, 10, 4, 123).unwrap();
    assert_eq!(a.da_perm, b.da_perm);
    assert_eq!(a.pvalue, b.pvalue);
}

#[test]
fn multi_feature_layout_is_read_from_da() {
    let (x, y) = two_class_dataset(12, 3, 4.0, 2);
    let clf = Classify::new(&y, ClassifierSpec::default(), cv(CvKind::StratifiedKFold)).unwrap();
    let da = clf.fit(&x, FeatureMode::Multi, 1).unwrap();
    let out = clf.stat(&x, &da, StatMethod::LabelShuffle, 5, 1, 0).unwrap();
    assert_eq!(out.pvalue.dim(), (1, 1));
    assert_eq!(out.da_perm.unwrap().dim(), (1, 5));

    let wrong = Array2::zeros((2, 2));
    assert!(clf.stat(&x, &wrong, StatMethod::LabelShuffle, 5, 1, 0).is_err());
}

#[test]
fn job_budget() {
    let split = JobSplit::new(6, 2).unwrap();
    assert_eq!((split.outer, split.inner), (2, 3));
    assert!(JobSplit::new(-3, 2).is_err());
}
