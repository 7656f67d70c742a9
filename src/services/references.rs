//! Reference-string formats, one strategy per document kind.
//!
//! Every format embeds the allocated sequence number zero-padded to the
//! kind's fixed width as the trailing token, so references sort
//! lexicographically within a scope. References are immutable once set and
//! globally unique (enforced by the store's unique index).

use chrono::{DateTime, Datelike, Utc};

/// Tag selecting the reference strategy for a document.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Opportunity,
    Offer,
    Proforma,
    Affaire,
    Invoice,
    Report,
    Attestation,
    Courrier,
}

impl DocumentKind {
    /// 3-letter document-type code used in scope keys and references.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Opportunity => "OPP",
            Self::Offer => "OFF",
            Self::Proforma => "PRO",
            Self::Affaire => "AFF",
            Self::Invoice => "FAC",
            Self::Report => "RAP",
            Self::Attestation => "ATT",
            Self::Courrier => "LTR",
        }
    }

    /// Fixed zero-pad width of the trailing sequence token.
    pub fn seq_width(&self) -> usize {
        match self {
            Self::Affaire | Self::Courrier => 3,
            _ => 4,
        }
    }

    pub fn pad_seq(&self, seq: i32) -> String {
        format!("{:0width$}", seq, width = self.seq_width())
    }
}

fn yymmdd(at: DateTime<Utc>) -> String {
    format!("{:02}{:02}{:02}", at.year() % 100, at.month(), at.day())
}

fn yymm(at: DateTime<Utc>) -> String {
    format!("{:02}{:02}", at.year() % 100, at.month())
}

/// `KIP/OPP/C001/250315/VTE1/3/0001`
pub fn opportunity_reference(
    entity_code: &str,
    c_num: &str,
    at: DateTime<Utc>,
    product_code: &str,
    client_ordinal: i32,
    seq: i32,
) -> String {
    format!(
        "{}/OPP/{}/{}/{}/{}/{}",
        entity_code,
        c_num,
        yymmdd(at),
        product_code,
        client_ordinal,
        DocumentKind::Opportunity.pad_seq(seq)
    )
}

/// `KIP/OFF/C001/250315/VTE1/3/0001`
pub fn offer_reference(
    entity_code: &str,
    c_num: &str,
    at: DateTime<Utc>,
    product_code: &str,
    client_ordinal: i32,
    seq: i32,
) -> String {
    format!(
        "{}/OFF/{}/{}/{}/{}/{}",
        entity_code,
        c_num,
        yymmdd(at),
        product_code,
        client_ordinal,
        DocumentKind::Offer.pad_seq(seq)
    )
}

/// `KIP/PRO/C001/2503/12/3/0001` — the parent token is the won offer's
/// sequence number.
pub fn proforma_reference(
    entity_code: &str,
    c_num: &str,
    at: DateTime<Utc>,
    offer_sequence: i32,
    client_ordinal: i32,
    seq: i32,
) -> String {
    format!(
        "{}/PRO/{}/{}/{}/{}/{}",
        entity_code,
        c_num,
        yymm(at),
        offer_sequence,
        client_ordinal,
        DocumentKind::Proforma.pad_seq(seq)
    )
}

/// Concatenated, slash-free so it can be embedded inside child references:
/// `AFF2503` + client ordinal + offer sequence + `001`.
pub fn affaire_reference(
    at: DateTime<Utc>,
    client_ordinal: i32,
    offer_sequence: i32,
    seq: i32,
) -> String {
    format!(
        "AFF{}{}{}{}",
        yymm(at),
        client_ordinal,
        offer_sequence,
        DocumentKind::Affaire.pad_seq(seq)
    )
}

/// `KIP/FAC/C001/AFF2503...001/VTE1/2/0001`
pub fn invoice_reference(
    entity_code: &str,
    c_num: &str,
    affaire_reference: &str,
    product_code: &str,
    client_ordinal: i32,
    seq: i32,
) -> String {
    format!(
        "{}/FAC/{}/{}/{}/{}/{}",
        entity_code,
        c_num,
        affaire_reference,
        product_code,
        client_ordinal,
        DocumentKind::Invoice.pad_seq(seq)
    )
}

/// `KIP/RAP/C001/AFF2503...001/1/VTE1/4/0001`
#[allow(clippy::too_many_arguments)]
pub fn report_reference(
    entity_code: &str,
    c_num: &str,
    affaire_reference: &str,
    category_ordinal: i32,
    product_code: &str,
    client_ordinal: i32,
    seq: i32,
) -> String {
    format!(
        "{}/RAP/{}/{}/{}/{}/{}/{}",
        entity_code,
        c_num,
        affaire_reference,
        category_ordinal,
        product_code,
        client_ordinal,
        DocumentKind::Report.pad_seq(seq)
    )
}

/// `KIP/ATT/C001/250315/AFF2503...001/2/5/0001` — participant ordinal is
/// allocated per formation.
#[allow(clippy::too_many_arguments)]
pub fn attestation_reference(
    entity_code: &str,
    c_num: &str,
    at: DateTime<Utc>,
    affaire_reference: &str,
    client_ordinal: i32,
    participant_ordinal: i32,
    seq: i32,
) -> String {
    format!(
        "{}/ATT/{}/{}/{}/{}/{}/{}",
        entity_code,
        c_num,
        yymmdd(at),
        affaire_reference,
        client_ordinal,
        participant_ordinal,
        DocumentKind::Attestation.pad_seq(seq)
    )
}

/// Dash-delimited: `KIP-LTR-250315-C001-001`
pub fn courrier_reference(
    entity_code: &str,
    doc_type: &str,
    at: DateTime<Utc>,
    client_ref: &str,
    seq: i32,
) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        entity_code,
        doc_type,
        yymmdd(at),
        client_ref,
        DocumentKind::Courrier.pad_seq(seq)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn march_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn offer_reference_embeds_period_and_padded_sequence() {
        let reference = offer_reference("KIP", "C001", march_2025(), "VTE1", 1, 1);
        assert_eq!(reference, "KIP/OFF/C001/250315/VTE1/1/0001");
        assert!(reference.contains("2503"));
        assert!(reference.ends_with("0001"));
    }

    #[test]
    fn sequences_sort_lexicographically_within_scope() {
        let r1 = offer_reference("KIP", "C001", march_2025(), "VTE1", 1, 1);
        let r2 = offer_reference("KIP", "C001", march_2025(), "VTE1", 1, 2);
        let r12 = offer_reference("KIP", "C001", march_2025(), "VTE1", 1, 12);
        assert!(r1 < r2);
        assert!(r2 < r12);
    }

    #[test]
    fn affaire_reference_is_slash_free() {
        let reference = affaire_reference(march_2025(), 4, 7, 12);
        assert_eq!(reference, "AFF250347012");
        assert!(!reference.contains('/'));
    }

    #[test]
    fn invoice_reference_embeds_parent_affaire() {
        let affaire = affaire_reference(march_2025(), 4, 7, 12);
        let reference = invoice_reference("KIP", "C001", &affaire, "VTE1", 2, 12);
        assert!(reference.contains(&affaire));
        assert!(reference.ends_with("0012"));
    }

    #[test]
    fn courrier_reference_is_dash_delimited() {
        let reference = courrier_reference("KIP", "LTR", march_2025(), "C001", 3);
        assert_eq!(reference, "KIP-LTR-250315-C001-003");
    }

    #[test]
    fn seq_width_matches_kind() {
        assert_eq!(DocumentKind::Offer.pad_seq(7), "0007");
        assert_eq!(DocumentKind::Affaire.pad_seq(7), "007");
        assert_eq!(DocumentKind::Courrier.pad_seq(7), "007");
    }
}
