use crate::dates::DateRange;

/// One Evocon report endpoint and how its rows key into the warehouse.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Destination table name, snake_case.
    pub name: &'static str,
    /// Path segment under the reports base URL.
    pub path: &'static str,
    /// Query parameters for the extraction window.
    pub params: Vec<(&'static str, String)>,
    /// Merge key columns; resources without one are append-only.
    pub primary_key: Option<&'static [&'static str]>,
}

struct Endpoint {
    name: &'static str,
    path: &'static str,
    primary_key: Option<&'static [&'static str]>,
}

const ENDPOINTS: &[Endpoint] = &[
    Endpoint {
        name: "oee",
        path: "oee_json",
        primary_key: Some(&["station_id", "shift_id"]),
    },
    Endpoint {
        name: "downtime",
        path: "downtime_json",
        primary_key: Some(&["station_id", "start_time"]),
    },
    Endpoint {
        name: "losses",
        path: "losses_json",
        primary_key: Some(&["station_id", "shift_id", "loss_type"]),
    },
    Endpoint {
        name: "scrap",
        path: "scrap_json",
        primary_key: Some(&["station_id", "shift_id", "product_id", "reason"]),
    },
    Endpoint {
        name: "checklists",
        path: "checks_json",
        primary_key: None,
    },
    Endpoint {
        name: "quantity",
        path: "quantity_json",
        primary_key: Some(&["station_id", "shift_id", "product_id"]),
    },
    // client_metrics comes back empty for every account we have run against;
    // parked until Evocon fixes the feed on their side.
    // Endpoint {
    //     name: "client_metrics",
    //     path: "clientmetrics_json",
    //     primary_key: None,
    // },
];

/// Build the full extraction catalogue for one date window. Order here is
/// load order; tables land sequentially exactly as listed.
pub fn evocon_resources(range: &DateRange) -> Vec<Resource> {
    ENDPOINTS
        .iter()
        .map(|endpoint| Resource {
            name: endpoint.name,
            path: endpoint.path,
            params: vec![
                ("startTime", range.start_str()),
                ("endTime", range.end_str()),
            ],
            primary_key: endpoint.primary_key,
        })
        .collect()
}
