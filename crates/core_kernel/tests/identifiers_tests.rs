//! Tests for the identifier newtypes

use core_kernel::{
    UserId, PropertyId, SpvId, PropertyDocumentId, InvestmentId, TransactionId,
    MarketOrderId, TradeId, KycDocumentId, DividendId,
};
use std::collections::HashSet;
use uuid::Uuid;

mod generation {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let ids: HashSet<PropertyId> = (0..100).map(|_| PropertyId::new()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_new_v7_is_time_ordered() {
        let first = TransactionId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = TransactionId::new_v7();
        assert!(first < second);
    }

    #[test]
    fn test_default_is_random() {
        assert_ne!(UserId::default(), UserId::default());
    }
}

mod display_and_parse {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert!(UserId::new().to_string().starts_with("USR-"));
        assert!(PropertyId::new().to_string().starts_with("PROP-"));
        assert!(SpvId::new().to_string().starts_with("SPV-"));
        assert!(PropertyDocumentId::new().to_string().starts_with("PDOC-"));
        assert!(InvestmentId::new().to_string().starts_with("INVT-"));
        assert!(TransactionId::new().to_string().starts_with("TXN-"));
        assert!(MarketOrderId::new().to_string().starts_with("ORD-"));
        assert!(TradeId::new().to_string().starts_with("TRD-"));
        assert!(KycDocumentId::new().to_string().starts_with("KYC-"));
        assert!(DividendId::new().to_string().starts_with("DIV-"));
    }

    #[test]
    fn test_parse_with_prefix() {
        let id = MarketOrderId::new();
        let parsed: MarketOrderId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_bare_uuid() {
        let uuid = Uuid::new_v4();
        let parsed: TradeId = uuid.to_string().parse().unwrap();
        assert_eq!(*parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!("PROP-not-a-uuid".parse::<PropertyId>().is_err());
    }

    #[test]
    fn test_prefix_accessor() {
        assert_eq!(KycDocumentId::prefix(), "KYC");
    }
}

mod serialization {
    use super::*;

    #[test]
    fn test_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = InvestmentId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));

        let back: InvestmentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
