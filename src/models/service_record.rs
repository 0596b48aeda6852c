// src/models/service_record.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::pagination::ListQuery;

/// Number of procedure column groups in `lucrari`.
pub const PROCEDURE_SLOTS: usize = 4;

/// Stored order numbers run one ahead of the number shown to people.
/// Listing, export and certificate all go through here.
pub fn displayed_order_number(stored: i32) -> i32 {
    stored - 1
}

/// One `(procedure, product_name, product_lot, product_quantity, concentration)` group.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureSlot {
    #[schema(example = "Deratizare")]
    pub procedure: String,
    pub product_name: Option<String>,
    pub product_lot: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub product_quantity: Option<Decimal>,
    pub concentration: Option<String>,
}

/// A lucrare about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewServiceRecord {
    pub order_number: i32,
    pub customer_id: Uuid,
    pub employee_id: Uuid,
    pub slots: [Option<ProcedureSlot>; PROCEDURE_SLOTS],
}

/// Flat `lucrari` row joined with customer and employee names.
#[derive(Debug, Clone, FromRow)]
pub struct ServiceRecordRow {
    pub id: Uuid,
    pub numar_ordine: i32,
    pub created_at: DateTime<Utc>,
    pub customer_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub employee_name: Option<String>,

    pub procedure1: Option<String>,
    pub product_name1: Option<String>,
    pub product_lot1: Option<String>,
    pub product_quantity1: Option<Decimal>,
    pub concentration1: Option<String>,

    pub procedure2: Option<String>,
    pub product_name2: Option<String>,
    pub product_lot2: Option<String>,
    pub product_quantity2: Option<Decimal>,
    pub concentration2: Option<String>,

    pub procedure3: Option<String>,
    pub product_name3: Option<String>,
    pub product_lot3: Option<String>,
    pub product_quantity3: Option<Decimal>,
    pub concentration3: Option<String>,

    pub procedure4: Option<String>,
    pub product_name4: Option<String>,
    pub product_lot4: Option<String>,
    pub product_quantity4: Option<Decimal>,
    pub concentration4: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: Uuid,
    /// Raw `numar_ordine`.
    pub order_number: i32,
    /// What people see (`order_number - 1`).
    pub display_number: i32,
    pub created_at: DateTime<Utc>,
    pub customer_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub employee_name: Option<String>,
    /// Always four entries; unused slots are null.
    pub procedures: Vec<Option<ProcedureSlot>>,
}

fn slot(
    procedure: Option<String>,
    product_name: Option<String>,
    product_lot: Option<String>,
    product_quantity: Option<Decimal>,
    concentration: Option<String>,
) -> Option<ProcedureSlot> {
    procedure.map(|procedure| ProcedureSlot {
        procedure,
        product_name,
        product_lot,
        product_quantity,
        concentration,
    })
}

impl From<ServiceRecordRow> for ServiceRecord {
    fn from(row: ServiceRecordRow) -> Self {
        let procedures = vec![
            slot(row.procedure1, row.product_name1, row.product_lot1, row.product_quantity1, row.concentration1),
            slot(row.procedure2, row.product_name2, row.product_lot2, row.product_quantity2, row.concentration2),
            slot(row.procedure3, row.product_name3, row.product_lot3, row.product_quantity3, row.concentration3),
            slot(row.procedure4, row.product_name4, row.product_lot4, row.product_quantity4, row.concentration4),
        ];

        Self {
            id: row.id,
            order_number: row.numar_ordine,
            display_number: displayed_order_number(row.numar_ordine),
            created_at: row.created_at,
            customer_id: row.customer_id,
            employee_id: row.employee_id,
            customer_name: row.customer_name,
            employee_name: row.employee_name,
            procedures,
        }
    }
}

/// `?from=&to=&customerId=&page=&perPage=` on the records screen.
#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RecordFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub customer_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl RecordFilter {
    pub fn paging(&self) -> ListQuery {
        ListQuery {
            q: None,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
