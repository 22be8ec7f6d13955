//! Terminal output for predictions, flow cards, reports and smoke runs.

use flowscope_ai::Prediction;
use flowscope_ai::evaluate::ClassificationReport;
use flowscope_client::{Check, SmokeCase, Status};
use flowscope_core::FeatureVector;

// ── Schema section groupings ──

const IDENTITY: &[&str] = &[
    "Flow ID",
    "Source IP",
    "Source Port",
    "Destination IP",
    "Destination Port",
    "Protocol",
    "Timestamp",
];

const VOLUME: &[&str] = &[
    "Flow Duration",
    "Total Fwd Packets",
    "Total Backward Packets",
    "Total Length of Fwd Packets",
    "Total Length of Bwd Packets",
    "Flow Bytes/s",
    "Flow Packets/s",
    "Fwd Packets/s",
    "Bwd Packets/s",
];

const PACKET_SIZE: &[&str] = &[
    "Fwd Packet Length Max",
    "Fwd Packet Length Min",
    "Fwd Packet Length Mean",
    "Fwd Packet Length Std",
    "Bwd Packet Length Max",
    "Bwd Packet Length Min",
    "Bwd Packet Length Mean",
    "Bwd Packet Length Std",
    "Min Packet Length",
    "Max Packet Length",
    "Packet Length Mean",
    "Packet Length Std",
    "Packet Length Variance",
    "Average Packet Size",
    "Avg Fwd Segment Size",
    "Avg Bwd Segment Size",
];

const TIMING: &[&str] = &[
    "Flow IAT Mean",
    "Flow IAT Std",
    "Flow IAT Max",
    "Flow IAT Min",
    "Fwd IAT Total",
    "Fwd IAT Mean",
    "Fwd IAT Std",
    "Fwd IAT Max",
    "Fwd IAT Min",
    "Bwd IAT Total",
    "Bwd IAT Mean",
    "Bwd IAT Std",
    "Bwd IAT Max",
    "Bwd IAT Min",
    "Active Mean",
    "Active Std",
    "Active Max",
    "Active Min",
    "Idle Mean",
    "Idle Std",
    "Idle Max",
    "Idle Min",
];

const FLAGS: &[&str] = &[
    "Fwd PSH Flags",
    "Bwd PSH Flags",
    "Fwd URG Flags",
    "Bwd URG Flags",
    "FIN Flag Count",
    "SYN Flag Count",
    "RST Flag Count",
    "PSH Flag Count",
    "ACK Flag Count",
    "URG Flag Count",
    "CWE Flag Count",
    "ECE Flag Count",
];

const HEADERS: &[&str] = &[
    "Fwd Header Length",
    "Bwd Header Length",
    "Init_Win_bytes_forward",
    "Init_Win_bytes_backward",
    "act_data_pkt_fwd",
    "min_seg_size_forward",
    "Down/Up Ratio",
];

const BULK: &[&str] = &[
    "Fwd Avg Bytes/Bulk",
    "Fwd Avg Packets/Bulk",
    "Fwd Avg Bulk Rate",
    "Bwd Avg Bytes/Bulk",
    "Bwd Avg Packets/Bulk",
    "Bwd Avg Bulk Rate",
    "Subflow Fwd Packets",
    "Subflow Fwd Bytes",
    "Subflow Bwd Packets",
    "Subflow Bwd Bytes",
];

const SECTIONS: &[(&str, &[&str])] = &[
    ("Identity", IDENTITY),
    ("Volume", VOLUME),
    ("Packet Sizes", PACKET_SIZE),
    ("Timing", TIMING),
    ("Flags", FLAGS),
    ("Headers & Windows", HEADERS),
    ("Bulk & Subflows", BULK),
];

// ── Public API ──

/// Print a feature vector as a vertical card grouped by section.
///
/// Features outside the known sections are listed last under "Other".
pub fn print_flow_card(title: &str, vector: &FeatureVector) {
    println!("=== {title} ===");
    for (header, cols) in SECTIONS {
        print_section(vector, header, cols);
    }

    let other: Vec<(&str, f64)> = vector
        .iter()
        .filter(|(name, _)| !SECTIONS.iter().any(|(_, cols)| cols.contains(name)))
        .collect();
    if !other.is_empty() {
        println!("Other");
        for (name, value) in other {
            println!("  {:<30} {}", name, value);
        }
    }
    println!();
}

fn print_section(vector: &FeatureVector, header: &str, cols: &[&str]) {
    let present: Vec<(&str, f64)> = cols
        .iter()
        .filter_map(|&col| vector.get(col).map(|v| (col, v)))
        .collect();
    if present.is_empty() {
        return;
    }
    println!("{header}");
    for (name, value) in present {
        println!("  {:<30} {}", name, value);
    }
}

/// Print a prediction with its probability table, most likely first.
pub fn print_prediction(title: &str, prediction: &Prediction) {
    println!("{title}");
    println!("  {:<30} {}", "Prediction", prediction.label);
    for (class, p) in prediction.ranked() {
        println!("  {:<30} {:.4}", class, p);
    }
}

pub fn print_report(report: &ClassificationReport) {
    println!("Classification Report:");
    print!("{report}");
}

pub fn print_top_features(features: &[(String, f64)]) {
    println!("Top {} Features:", features.len());
    for (name, importance) in features {
        println!("  {:<30} {:.6}", name, importance);
    }
}

pub fn print_smoke_case(case: &SmokeCase) {
    println!("Testing label: {}", case.label);
    print_check("Web", &case.http, case.http_status(), &case.label);
    print_check("Direct", &case.direct, case.direct_status(), &case.label);
    println!();
}

fn print_check(kind: &str, check: &Check, status: Status, expected: &str) {
    match check {
        Check::Predicted(label) => {
            println!("{kind} Prediction: {label}");
            println!("Expected: {expected}");
        }
        Check::Error(message) => println!("{kind} Error: {message}"),
    }
    println!("{kind} Status: {status}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowscope_core::FEATURE_NAMES;

    #[test]
    fn sections_cover_schema_once() {
        for name in FEATURE_NAMES {
            let hits = SECTIONS
                .iter()
                .filter(|(_, cols)| cols.contains(&name))
                .count();
            assert_eq!(hits, 1, "{name}");
        }
        let total: usize = SECTIONS.iter().map(|(_, cols)| cols.len()).sum();
        assert_eq!(total, FEATURE_NAMES.len());
    }
}
