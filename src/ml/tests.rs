//! Tests for the ML capability

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::TrainingConfig;
    use crate::error::PredictionError;
    use crate::types::{FeatureVector, Offer, TrainingSet};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn make_offer(id: &str, price: Decimal, quality: u32) -> Offer {
        Offer {
            offer_id: id.to_string(),
            product_id: "1".to_string(),
            merchant_id: format!("m-{}", id),
            price,
            quality,
        }
    }

    struct ConstantModel(Vec<f64>);

    impl ProductModel for ConstantModel {
        fn predict_proba(&self, _rows: &[FeatureVector]) -> Result<Vec<f64>, PredictionError> {
            Ok(self.0.clone())
        }
    }

    /// Sells whenever the offer is the cheapest one
    fn cheapest_sells_set() -> TrainingSet {
        let extractor = CompetitiveFeatureExtractor::new();
        let mut set = TrainingSet::default();
        for i in 0..40 {
            let own_price = Decimal::from(8 + (i % 10));
            let offers = vec![
                make_offer("own", own_price, 2),
                make_offer("a", dec!(12.5), 1),
                make_offer("b", dec!(14), 3),
            ];
            let features = extractor.extract_features("own", &offers);
            let label = if own_price < dec!(12.5) { 1 } else { 0 };
            set.push(features, label);
        }
        set
    }

    #[test]
    fn test_feature_layout() {
        let extractor = CompetitiveFeatureExtractor::new();
        let offers = vec![
            make_offer("own", dec!(10), 2),
            make_offer("a", dec!(8), 1),
            make_offer("b", dec!(12), 3),
        ];

        let features = extractor.extract_features("own", &offers);

        assert_eq!(features.len(), FEATURE_COUNT);
        assert_eq!(features[0], 2.0); // one cheaper offer
        assert_eq!(features[1], 3.0);
        assert_eq!(features[2], 10.0);
        assert_eq!(features[3], 2.0); // 10 - 8
        assert_eq!(features[4], 2.0);
        assert_eq!(features[5], 0.0);
        assert_eq!(features[6], 1.0); // mean competitor price is 10
    }

    #[test]
    fn test_features_alone_and_missing() {
        let extractor = CompetitiveFeatureExtractor::new();
        let alone = vec![make_offer("own", dec!(10), 1)];

        let features = extractor.extract_features("own", &alone);
        assert_eq!(features[0], 1.0);
        assert_eq!(features[3], 0.0);
        assert_eq!(features[5], 1.0);
        assert_eq!(features[6], 1.0);

        let missing = extractor.extract_features("ghost", &alone);
        assert_eq!(missing, vec![0.0; FEATURE_COUNT]);
    }

    #[test]
    fn test_model_set_unknown_product() {
        let models = ModelSet::new();
        let result = models.predict("42", &[vec![1.0]]);
        assert_eq!(result, Err(PredictionError::UnknownProduct("42".to_string())));
    }

    #[test]
    fn test_model_set_rejects_malformed_output() {
        let mut models = ModelSet::new();
        models.insert("short", Box::new(ConstantModel(vec![0.5])));
        models.insert("range", Box::new(ConstantModel(vec![0.5, 1.5])));

        let rows = vec![vec![0.0], vec![1.0]];
        assert!(matches!(models.predict("short", &rows), Err(PredictionError::Malformed(_))));
        assert!(matches!(models.predict("range", &rows), Err(PredictionError::Malformed(_))));
    }

    #[test]
    fn test_model_handle_swap() {
        let handle = ModelHandle::empty();
        let before = handle.load();
        assert!(before.is_empty());

        let mut next = ModelSet::new();
        next.insert("1", Box::new(ConstantModel(vec![0.25])));
        let previous = handle.swap(next);

        // earlier readers keep their snapshot
        assert!(Arc::ptr_eq(&before, &previous));
        assert!(before.predict("1", &[vec![0.0]]).is_err());
        assert_eq!(handle.predict("1", &[vec![0.0]]), Ok(vec![0.25]));
    }

    #[test]
    fn test_logistic_learns_cheapest_sells() {
        let model = LogisticSaleModel::new(TrainingConfig::default());
        let mut sets = BTreeMap::new();
        sets.insert("1".to_string(), cheapest_sells_set());

        let models = model.train(&sets).unwrap();
        assert!(models.contains("1"));

        let extractor = CompetitiveFeatureExtractor::new();
        let context = |price: Decimal| {
            vec![
                make_offer("own", price, 2),
                make_offer("a", dec!(12.5), 1),
                make_offer("b", dec!(14), 3),
            ]
        };
        let rows = vec![
            extractor.extract_features("own", &context(dec!(9))),
            extractor.extract_features("own", &context(dec!(17))),
        ];

        let probabilities = models.predict("1", &rows).unwrap();
        assert!(probabilities[0] > 0.5, "cheap offer: {}", probabilities[0]);
        assert!(probabilities[1] < 0.5, "expensive offer: {}", probabilities[1]);
    }

    #[test]
    fn test_logistic_skips_single_class_and_empty() {
        let model = LogisticSaleModel::new(TrainingConfig::default());
        let mut never_sold = TrainingSet::default();
        never_sold.push(vec![1.0, 2.0], 0);
        never_sold.push(vec![2.0, 2.0], 0);

        let mut sets = BTreeMap::new();
        sets.insert("never".to_string(), never_sold);
        sets.insert("empty".to_string(), TrainingSet::default());

        let models = model.train(&sets).unwrap();
        assert!(models.is_empty());
    }

    #[test]
    fn test_logistic_rejects_ragged_rows() {
        let model = LogisticSaleModel::new(TrainingConfig::default());
        let mut ragged = TrainingSet::default();
        ragged.push(vec![1.0, 2.0], 0);
        ragged.push(vec![2.0], 1);

        assert!(model.fit(&ragged).is_err());
    }

    #[test]
    fn test_logistic_feature_width_mismatch() {
        let model = LogisticSaleModel::new(TrainingConfig::default());
        let fitted = model.fit(&cheapest_sells_set()).unwrap().unwrap();

        let result = fitted.predict_proba(&[vec![1.0, 2.0]]);
        assert_eq!(
            result,
            Err(PredictionError::FeatureWidth {
                expected: FEATURE_COUNT,
                actual: 2
            })
        );
    }
}
