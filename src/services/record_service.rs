// src/services/record_service.rs

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ServiceRecordRepository,
    models::{
        pagination::Page,
        service_record::{RecordFilter, ServiceRecord},
    },
    services::mail_service::{MailAttachment, MailService, CSV_CONTENT_TYPE},
};

const CSV_HEADER: [&str; 9] = [
    "Numar",
    "Data",
    "Client",
    "Angajat",
    "Procedura",
    "Produs",
    "Lot",
    "Cantitate",
    "Concentratie",
];

/// Listing and export of the submitted lucrari.
#[derive(Clone)]
pub struct RecordService {
    repo: ServiceRecordRepository,
    relay: MailService,
}

impl RecordService {
    pub fn new(repo: ServiceRecordRepository, relay: MailService) -> Self {
        Self { repo, relay }
    }

    pub async fn list(&self, filter: &RecordFilter) -> Result<Page<ServiceRecord>, AppError> {
        let paging = filter.paging();
        let pool = self.repo.pool();

        let rows = self
            .repo
            .list(pool, filter, Some(paging.per_page()), paging.offset())
            .await?;
        let total = self.repo.count(pool, filter).await?;

        Ok(Page::new(rows, total, &paging).map(ServiceRecord::from))
    }

    pub async fn get(&self, id: Uuid) -> Result<ServiceRecord, AppError> {
        self.repo
            .find_by_id(self.repo.pool(), id)
            .await?
            .map(ServiceRecord::from)
            .ok_or(AppError::RecordNotFound)
    }

    /// Every record matching `filter` as CSV, one line per used procedure slot.
    pub async fn export_csv(&self, filter: &RecordFilter) -> Result<String, AppError> {
        let rows = self.repo.list(self.repo.pool(), filter, None, 0).await?;
        let records: Vec<ServiceRecord> = rows.into_iter().map(ServiceRecord::from).collect();
        records_to_csv(&records)
    }

    pub async fn email_export(&self, filter: &RecordFilter, to: Option<&str>) -> Result<String, AppError> {
        let csv = self.export_csv(filter).await?;
        let filename = format!("lucrari-{}.csv", Utc::now().format("%Y%m%d"));

        self.relay
            .send(
                to,
                "Export lucrari".to_string(),
                "Exportul lucrarilor este atasat.".to_string(),
                vec![MailAttachment {
                    filename,
                    content_type: CSV_CONTENT_TYPE,
                    content: csv.into_bytes(),
                }],
            )
            .await
    }
}

pub fn records_to_csv(records: &[ServiceRecord]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| anyhow::anyhow!("CSV write failed: {}", e))?;

    for record in records {
        let number = record.display_number.to_string();
        let date = record.created_at.format("%d.%m.%Y %H:%M").to_string();
        let customer = record.customer_name.clone().unwrap_or_default();
        let employee = record.employee_name.clone().unwrap_or_default();

        for slot in record.procedures.iter().flatten() {
            let quantity = slot
                .product_quantity
                .map(|q| format!("{:.2}", q.round_dp(2)))
                .unwrap_or_default();

            writer
                .write_record([
                    number.as_str(),
                    date.as_str(),
                    customer.as_str(),
                    employee.as_str(),
                    slot.procedure.as_str(),
                    slot.product_name.as_deref().unwrap_or_default(),
                    slot.product_lot.as_deref().unwrap_or_default(),
                    quantity.as_str(),
                    slot.concentration.as_deref().unwrap_or_default(),
                ])
                .map_err(|e| anyhow::anyhow!("CSV write failed: {}", e))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("CSV flush failed: {}", e))?;
    let csv = String::from_utf8(bytes).map_err(|e| anyhow::anyhow!(e))?;
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::service_record::ProcedureSlot;
    use chrono::TimeZone;

    fn record(order_number: i32, procedures: Vec<Option<ProcedureSlot>>) -> ServiceRecord {
        ServiceRecord {
            id: Uuid::new_v4(),
            order_number,
            display_number: crate::models::service_record::displayed_order_number(order_number),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap(),
            customer_id: None,
            employee_id: None,
            customer_name: Some("SC Depozit SRL".to_string()),
            employee_name: Some("Popescu Ion".to_string()),
            procedures,
        }
    }

    fn slot(procedure: &str, product: Option<&str>) -> Option<ProcedureSlot> {
        Some(ProcedureSlot {
            procedure: procedure.to_string(),
            product_name: product.map(str::to_string),
            product_lot: None,
            product_quantity: Some("50".parse().unwrap()),
            concentration: None,
        })
    }

    #[test]
    fn export_uses_display_numbers_and_skips_empty_slots() {
        let records = vec![record(
            12,
            vec![slot("Deratizare", Some("Raticid")), None, slot("Dezinfectie", None), None],
        )];

        let csv = records_to_csv(&records).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Numar,Data,Client"));
        assert!(lines[1].starts_with("11,01.03.2024 10:15,SC Depozit SRL,Popescu Ion,Deratizare,Raticid,,50.00,"));
        assert!(lines[2].contains(",Dezinfectie,,"));
    }

    #[test]
    fn export_of_nothing_is_just_the_header() {
        let csv = records_to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
