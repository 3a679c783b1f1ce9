//! Transformation of SAM.gov opportunities into flat SharePoint field maps.
//!
//! Everything here is pure and total: [`transform`] never fails, whatever
//! combination of nested structures is present or absent. Unset values are
//! simply not inserted, so the resulting map never carries nulls.

use serde_json::{Map, Value};

use crate::sam::models::{Award, Opportunity, PlaceOfPerformance, PointOfContact};

/// Flat field mapping sent to SharePoint as the `fields` payload.
pub type FieldMap = Map<String, Value>;

/// Map a set-aside code to its FAR description. Unknown codes have no
/// entry; callers fall back to the code itself.
fn set_aside_description(code: &str) -> Option<&'static str> {
    let desc = match code {
        "SBA" => "Total Small Business Set-Aside (FAR 19.5)",
        "SBP" => "Partial Small Business Set-Aside (FAR 19.5)",
        "8A" => "8(a) Set-Aside (FAR 19.8)",
        "8AN" => "8(a) Sole Source (FAR 19.8)",
        "HZC" => "Historically Underutilized Business (HUBZone) Set-Aside (FAR 19.13)",
        "HZS" => "Historically Underutilized Business (HUBZone) Sole Source (FAR 19.13)",
        "SDVOSBC" => "Service-Disabled Veteran-Owned Small Business (SDVOSB) Set-Aside (FAR 19.14)",
        "SDVOSBS" => "Service-Disabled Veteran-Owned Small Business (SDVOSB) Sole Source (FAR 19.14)",
        "WOSB" => "Women-Owned Small Business (WOSB) Program Set-Aside (FAR 19.15)",
        "WOSBSS" => "Women-Owned Small Business (WOSB) Program Sole Source (FAR 19.15)",
        "EDWOSB" => "Economically Disadvantaged WOSB (EDWOSB) Program Set-Aside (FAR 19.15)",
        "EDWOSBSS" => "Economically Disadvantaged WOSB (EDWOSB) Program Sole Source (FAR 19.15)",
        "LAS" => "Local Area Set-Aside (FAR 26.2)",
        "IEE" => "Indian Economic Enterprise (IEE) Set-Aside",
        "ISBEE" => "Indian Small Business Economic Enterprise (ISBEE) Set-Aside",
        "BICiv" => "Buy Indian Set-Aside",
        "VSA" => "Veteran-Owned Small Business Set-Aside",
        "VSS" => "Veteran-Owned Small Business Sole source",
        _ => return None,
    };
    Some(desc)
}

/// Split a dot-delimited organization path into department / subtier /
/// office. Missing positions yield `None`.
pub fn parse_department_info(
    full_path: Option<&str>,
) -> (Option<String>, Option<String>, Option<String>) {
    let full_path = match full_path {
        Some(p) if !p.is_empty() => p,
        _ => return (None, None, None),
    };

    let mut parts = full_path.split('.');
    let department = parts.next().map(str::to_string);
    let subtier = parts.next().map(str::to_string);
    let office = parts.next().map(str::to_string);
    (department, subtier, office)
}

/// Normalize a date string for SharePoint. Values that already carry a time
/// component (contain `T`) pass through unchanged; bare dates get midnight
/// UTC appended. Empty or absent input yields `None`.
pub fn format_date(date_str: Option<&str>) -> Option<String> {
    let date_str = match date_str {
        Some(s) if !s.is_empty() => s,
        _ => return None,
    };

    if date_str.contains('T') {
        Some(date_str.to_string())
    } else {
        Some(format!("{date_str}T00:00:00Z"))
    }
}

/// Select the contact to surface: the first entry tagged `primary`, falling
/// back to the first entry in the list.
fn select_contact(contacts: &[PointOfContact]) -> Option<&PointOfContact> {
    contacts
        .iter()
        .find(|c| c.contact_type.as_deref() == Some("primary"))
        .or_else(|| contacts.first())
}

/// Insert a value unless it is unset. This is what keeps the output free of
/// nulls.
fn insert_opt(fields: &mut FieldMap, key: &str, value: Option<String>) {
    if let Some(v) = value {
        fields.insert(key.to_string(), Value::String(v));
    }
}

fn add_contact_fields(fields: &mut FieldMap, contacts: &[PointOfContact]) {
    if let Some(poc) = select_contact(contacts) {
        insert_opt(fields, "POC_Name", poc.full_name.clone());
        insert_opt(fields, "POC_Email", poc.email.clone());
        insert_opt(fields, "POC_Phone", poc.phone.clone());
        insert_opt(fields, "POC_Title", poc.title.clone());
    }
}

fn add_place_of_performance_fields(fields: &mut FieldMap, pop: Option<&PlaceOfPerformance>) {
    if let Some(pop) = pop {
        insert_opt(
            fields,
            "PoP_City",
            pop.city.as_ref().and_then(|c| c.name.clone()),
        );
        insert_opt(
            fields,
            "PoP_State",
            pop.state.as_ref().and_then(|s| s.name.clone()),
        );
        insert_opt(
            fields,
            "PoP_Country",
            pop.country.as_ref().and_then(|c| c.name.clone()),
        );
    }
}

fn add_award_fields(fields: &mut FieldMap, award: Option<&Award>) {
    if let Some(award) = award {
        insert_opt(fields, "AwardNumber", award.number.clone());
        insert_opt(fields, "AwardAmount", award.amount.clone());
        insert_opt(fields, "AwardDate", format_date(award.date.as_deref()));
        insert_opt(
            fields,
            "AwardeeName",
            award.awardee.as_ref().and_then(|a| a.name.clone()),
        );
        insert_opt(
            fields,
            "AwardeeLocation",
            award.awardee.as_ref().and_then(|a| a.location.clone()),
        );
    }
}

/// Transform one opportunity into the flat SharePoint field map.
///
/// Total over any input: absent nested structures simply contribute no
/// fields, and the result never contains null values.
pub fn transform(opp: &Opportunity) -> FieldMap {
    let (department, subtier, office) =
        parse_department_info(opp.full_parent_path_name.as_deref());

    let set_aside_desc = opp.type_of_set_aside.as_deref().map(|code| {
        set_aside_description(code)
            .map(str::to_string)
            .unwrap_or_else(|| code.to_string())
    });

    let mut fields = FieldMap::new();
    insert_opt(&mut fields, "Title", opp.title.clone());
    insert_opt(&mut fields, "NoticeId", opp.notice_id.clone());
    insert_opt(&mut fields, "SolicitationNumber", opp.solicitation_number.clone());
    insert_opt(&mut fields, "Department", department);
    insert_opt(&mut fields, "Subtier", subtier);
    insert_opt(&mut fields, "Office", office);
    insert_opt(&mut fields, "FullParentPath", opp.full_parent_path_name.clone());
    insert_opt(&mut fields, "FullParentCode", opp.full_parent_path_code.clone());
    insert_opt(&mut fields, "PostedDate", format_date(opp.posted_date.as_deref()));
    insert_opt(
        &mut fields,
        "ResponseDeadline",
        format_date(opp.response_deadline.as_deref()),
    );
    insert_opt(&mut fields, "Type", opp.notice_type.clone());
    insert_opt(&mut fields, "BaseType", opp.base_type.clone());
    insert_opt(&mut fields, "SetAsideCode", opp.type_of_set_aside.clone());
    insert_opt(&mut fields, "SetAsideDescription", set_aside_desc);
    insert_opt(&mut fields, "NAICSCode", opp.naics_code.clone());
    insert_opt(&mut fields, "ClassificationCode", opp.classification_code.clone());
    insert_opt(&mut fields, "Active", opp.active.clone());
    insert_opt(&mut fields, "OrganizationType", opp.organization_type.clone());
    insert_opt(&mut fields, "AdditionalInfoLink", opp.additional_info_link.clone());
    insert_opt(&mut fields, "UILink", opp.ui_link.clone());
    insert_opt(&mut fields, "DescriptionLink", opp.description.clone());

    add_contact_fields(&mut fields, &opp.point_of_contact);
    add_place_of_performance_fields(&mut fields, opp.place_of_performance.as_ref());
    add_award_fields(&mut fields, opp.award.as_ref());

    fields
}
