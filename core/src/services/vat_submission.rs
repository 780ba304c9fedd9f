//! VAT submission packages
//!
//! Builds the BTW and ICP filing payloads as UTF-8 XML and validates them
//! before they are handed to the transport collaborator. Signing uses the
//! certificate store interface; the core only checks the validity window.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashSet;
use std::io::Cursor;

use crate::context::RequestContext;
use crate::entities::{administration, journal_entry, journal_line, vat_code};
use crate::entities::EntryStatus;
use crate::error::{CoreError, CoreResult};
use crate::interfaces::CertificateStore;
use crate::services::period_control::PeriodControlService;
use crate::services::vat_posting::VatPostingService;

pub struct VatSubmissionService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Btw,
    Icp,
}

/// One aggregated ICP line: everything supplied to one EU customer.
#[derive(Debug, Clone, PartialEq)]
pub struct IcpEntry {
    pub customer_vat_number: String,
    pub country_code: String,
    pub taxable_base: Decimal,
}

#[derive(Debug, Clone)]
pub struct SubmissionMeta {
    pub period_id: i32,
    pub period_name: String,
    pub period_start: chrono::NaiveDate,
    pub period_end: chrono::NaiveDate,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AdministrationInfo {
    pub id: i32,
    pub name: String,
    pub vat_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BtwTotals {
    pub vat_payable: Decimal,
    pub vat_receivable: Decimal,
    pub net_vat: Decimal,
}

fn write_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    value: &str,
) -> CoreResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

fn xml_err(e: impl std::fmt::Display) -> CoreError {
    CoreError::ValidationFailed {
        errors: vec![e.to_string()],
    }
}

fn write_metadata(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    meta: &SubmissionMeta,
) -> CoreResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new("metadata")))
        .map_err(xml_err)?;
    write_element(writer, "period-id", &meta.period_id.to_string())?;
    write_element(writer, "period-name", &meta.period_name)?;
    write_element(writer, "period-start", &meta.period_start.to_string())?;
    write_element(writer, "period-end", &meta.period_end.to_string())?;
    write_element(
        writer,
        "generated-at",
        &meta.generated_at.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
    )?;
    writer
        .write_event(Event::End(BytesEnd::new("metadata")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_administration(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    admin: &AdministrationInfo,
) -> CoreResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new("administration")))
        .map_err(xml_err)?;
    write_element(writer, "id", &admin.id.to_string())?;
    write_element(writer, "name", &admin.name)?;
    if let Some(vat_number) = &admin.vat_number {
        write_element(writer, "vat-number", vat_number)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("administration")))
        .map_err(xml_err)?;
    Ok(())
}

/// Build the BTW (periodic VAT return) payload.
pub fn build_btw_xml(
    meta: &SubmissionMeta,
    admin: &AdministrationInfo,
    totals: &BtwTotals,
) -> CoreResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut root = BytesStart::new("btw-aangifte");
    root.push_attribute(("xmlns", "http://www.belastingdienst.nl/btw/aangifte/v1"));
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    write_metadata(&mut writer, meta)?;
    write_administration(&mut writer, admin)?;

    writer
        .write_event(Event::Start(BytesStart::new("vat-boxes")))
        .map_err(xml_err)?;
    write_element(&mut writer, "vat-payable", &totals.vat_payable.to_string())?;
    write_element(
        &mut writer,
        "vat-receivable",
        &totals.vat_receivable.to_string(),
    )?;
    writer
        .write_event(Event::End(BytesEnd::new("vat-boxes")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("totals")))
        .map_err(xml_err)?;
    write_element(&mut writer, "net-vat", &totals.net_vat.to_string())?;
    writer
        .write_event(Event::End(BytesEnd::new("totals")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("btw-aangifte")))
        .map_err(xml_err)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
}

/// Build the ICP (intra-community supplies) payload.
pub fn build_icp_xml(
    meta: &SubmissionMeta,
    admin: &AdministrationInfo,
    entries: &[IcpEntry],
) -> CoreResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut root = BytesStart::new("icp-aangifte");
    root.push_attribute(("xmlns", "http://www.belastingdienst.nl/icp/aangifte/v1"));
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    write_metadata(&mut writer, meta)?;
    write_administration(&mut writer, admin)?;

    writer
        .write_event(Event::Start(BytesStart::new("icp-entries")))
        .map_err(xml_err)?;
    for entry in entries {
        writer
            .write_event(Event::Start(BytesStart::new("icp-entry")))
            .map_err(xml_err)?;
        write_element(&mut writer, "customer-vat-number", &entry.customer_vat_number)?;
        write_element(&mut writer, "country-code", &entry.country_code)?;
        write_element(&mut writer, "taxable-base", &entry.taxable_base.to_string())?;
        writer
            .write_event(Event::End(BytesEnd::new("icp-entry")))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("icp-entries")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("icp-aangifte")))
        .map_err(xml_err)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
}

/// Schema checks on a submission payload: well-formedness, an allowed root,
/// required `metadata` and `administration` sections, and the body section
/// matching the root. Returns the list of violations.
pub fn validate_payload(xml: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = true;

    let mut root: Option<String> = None;
    let mut seen: HashSet<String> = HashSet::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                if root.is_none() {
                    root = Some(name.clone());
                }
                seen.insert(name);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                errors.push(format!("XML is not well-formed: {}", e));
                return errors;
            }
        }
    }

    let Some(root) = root else {
        errors.push("Document has no root element".to_string());
        return errors;
    };

    if root != "btw-aangifte" && root != "icp-aangifte" {
        errors.push(format!(
            "Invalid root element: {}. Expected 'btw-aangifte' or 'icp-aangifte'",
            root
        ));
    }

    if !seen.contains("metadata") {
        errors.push("Missing required metadata section".to_string());
    }
    if !seen.contains("administration") {
        errors.push("Missing required administration section".to_string());
    }

    if root == "btw-aangifte" && !seen.contains("vat-boxes") && !seen.contains("totals") {
        errors.push("Missing required vat-boxes or totals section".to_string());
    }
    if root == "icp-aangifte" && !seen.contains("icp-entries") {
        errors.push("Missing required icp-entries section".to_string());
    }

    errors
}

impl VatSubmissionService {
    /// Build and validate the submission payload for a period.
    pub async fn build_submission(
        db: &DatabaseConnection,
        ctx: &RequestContext,
        period_id: i32,
        kind: SubmissionKind,
    ) -> CoreResult<String> {
        let period = PeriodControlService::get_period(db, ctx, period_id).await?;

        let admin_row = administration::Entity::find_by_id(ctx.tenant_id)
            .one(db)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "administration",
                id: ctx.tenant_id,
            })?;
        let admin = AdministrationInfo {
            id: admin_row.id,
            name: admin_row.name,
            vat_number: admin_row.vat_number,
        };

        let meta = SubmissionMeta {
            period_id: period.id,
            period_name: period.name.clone(),
            period_start: period.start_date,
            period_end: period.end_date,
            generated_at: Utc::now(),
        };

        let xml = match kind {
            SubmissionKind::Btw => {
                let summary =
                    VatPostingService::vat_summary(db, ctx, period.start_date, period.end_date)
                        .await?;
                build_btw_xml(
                    &meta,
                    &admin,
                    &BtwTotals {
                        vat_payable: summary.vat_payable,
                        vat_receivable: summary.vat_receivable,
                        net_vat: summary.net_vat,
                    },
                )?
            }
            SubmissionKind::Icp => {
                let entries =
                    Self::icp_entries(db, ctx, period.start_date, period.end_date).await?;
                build_icp_xml(&meta, &admin, &entries)?
            }
        };

        let errors = validate_payload(&xml);
        if !errors.is_empty() {
            return Err(CoreError::ValidationFailed { errors });
        }

        Ok(xml)
    }

    /// Aggregate posted ICP lines per customer VAT number and country.
    pub async fn icp_entries<C: ConnectionTrait>(
        conn: &C,
        ctx: &RequestContext,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> CoreResult<Vec<IcpEntry>> {
        let icp_codes: Vec<i32> = vat_code::Entity::find()
            .filter(vat_code::Column::TenantId.eq(ctx.tenant_id))
            .filter(vat_code::Column::IsIcp.eq(true))
            .all(conn)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        if icp_codes.is_empty() {
            return Ok(Vec::new());
        }

        let lines = journal_line::Entity::find()
            .left_join(journal_entry::Entity)
            .filter(journal_entry::Column::TenantId.eq(ctx.tenant_id))
            .filter(journal_entry::Column::Status.eq(EntryStatus::Posted))
            .filter(journal_entry::Column::EntryDate.gte(start))
            .filter(journal_entry::Column::EntryDate.lte(end))
            .filter(journal_line::Column::VatCodeId.is_in(icp_codes))
            .filter(journal_line::Column::PartyVatNumber.is_not_null())
            .all(conn)
            .await?;

        let mut entries: Vec<IcpEntry> = Vec::new();
        for line in lines {
            let Some(vat_number) = line.party_vat_number.clone() else {
                continue;
            };
            let country = line.vat_country.clone().unwrap_or_default();
            let base = line.vat_base_amount.unwrap_or(Decimal::ZERO);
            if base.is_zero() {
                continue;
            }

            match entries
                .iter_mut()
                .find(|e| e.customer_vat_number == vat_number && e.country_code == country)
            {
                Some(entry) => entry.taxable_base += base,
                None => entries.push(IcpEntry {
                    customer_vat_number: vat_number,
                    country_code: country,
                    taxable_base: base,
                }),
            }
        }

        entries.sort_by(|a, b| a.customer_vat_number.cmp(&b.customer_vat_number));
        Ok(entries)
    }

    /// Sign a validated payload via the certificate store. The certificate
    /// must be inside its validity window at signing time.
    pub async fn sign_submission(
        store: &dyn CertificateStore,
        certificate_reference: &str,
        payload: &str,
    ) -> CoreResult<Vec<u8>> {
        let material = store
            .resolve(certificate_reference)
            .await
            .map_err(|e| CoreError::CertificateInvalid {
                reason: e.to_string(),
            })?;

        let now = Utc::now();
        if now < material.not_before || now > material.not_after {
            return Err(CoreError::CertificateInvalid {
                reason: format!(
                    "certificate {} is outside its validity window ({} - {})",
                    material.subject, material.not_before, material.not_after
                ),
            });
        }

        store
            .sign(certificate_reference, payload.as_bytes())
            .await
            .map_err(|e| CoreError::CertificateInvalid {
                reason: format!("signing failed: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn meta() -> SubmissionMeta {
        SubmissionMeta {
            period_id: 7,
            period_name: "2024-Q1".to_string(),
            period_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            generated_at: Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap(),
        }
    }

    fn admin() -> AdministrationInfo {
        AdministrationInfo {
            id: 1,
            name: "Jansen Consultancy".to_string(),
            vat_number: Some("NL001234567B01".to_string()),
        }
    }

    #[test]
    fn btw_payload_validates() {
        let xml = build_btw_xml(
            &meta(),
            &admin(),
            &BtwTotals {
                vat_payable: dec!(2100.00),
                vat_receivable: dec!(315.00),
                net_vat: dec!(1785.00),
            },
        )
        .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<btw-aangifte"));
        assert!(xml.contains("<vat-payable>2100.00</vat-payable>"));
        assert!(xml.contains("<net-vat>1785.00</net-vat>"));
        assert!(validate_payload(&xml).is_empty());
    }

    #[test]
    fn icp_payload_validates_and_lists_entries() {
        let entries = vec![
            IcpEntry {
                customer_vat_number: "BE0123456789".to_string(),
                country_code: "BE".to_string(),
                taxable_base: dec!(800.00),
            },
            IcpEntry {
                customer_vat_number: "DE811234567".to_string(),
                country_code: "DE".to_string(),
                taxable_base: dec!(1500.00),
            },
        ];

        let xml = build_icp_xml(&meta(), &admin(), &entries).unwrap();
        assert!(xml.contains("<icp-aangifte"));
        assert!(xml.contains("<customer-vat-number>BE0123456789</customer-vat-number>"));
        assert!(xml.contains("<country-code>DE</country-code>"));
        assert!(xml.contains("<taxable-base>1500.00</taxable-base>"));
        assert!(validate_payload(&xml).is_empty());
    }

    #[test]
    fn validation_rejects_wrong_root() {
        let errors = validate_payload("<something><metadata/><administration/></something>");
        assert!(errors.iter().any(|e| e.contains("Invalid root element")));
    }

    #[test]
    fn validation_rejects_missing_sections() {
        let errors = validate_payload("<btw-aangifte><metadata>x</metadata></btw-aangifte>");
        assert!(errors.iter().any(|e| e.contains("administration")));
        assert!(errors.iter().any(|e| e.contains("vat-boxes")));
    }

    #[test]
    fn validation_rejects_malformed_xml() {
        let errors = validate_payload("<btw-aangifte><metadata></btw-aangifte>");
        assert!(!errors.is_empty());
        assert!(errors[0].contains("not well-formed"));
    }

    #[test]
    fn icp_without_entries_section_fails() {
        let xml = "<icp-aangifte><metadata>m</metadata><administration>a</administration></icp-aangifte>";
        let errors = validate_payload(xml);
        assert!(errors.iter().any(|e| e.contains("icp-entries")));
    }
}
