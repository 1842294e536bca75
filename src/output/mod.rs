pub mod formatter;

pub use formatter::{
    format_cluster_detail, format_cluster_table, format_json, format_reclassifications,
    format_status, format_tsv, should_use_colors, ClusterRow,
};
