//! `search` command: discover, optionally enrich rosters, filter, print.

use std::sync::Arc;

use clap::Args;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use clinicfind_client::ClinicApiClient;
use clinicfind_core::{AppConfig, DoctorDetail, FacetOptions, FilterState};
use clinicfind_discovery::{
    discover, DetailCache, DetailSnapshot, EntryState, RankedClinic, RegionHint, ResolvedLocation,
};

use crate::locate::{build_resolver, describe_location, PositionArgs};

#[derive(Debug, Clone, Default, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub position: PositionArgs,

    /// Refine the search to this city (overrides the IP location hint)
    #[arg(long)]
    pub city: Option<String>,

    /// Refine the search to this region (overrides the IP location hint)
    #[arg(long)]
    pub region: Option<String>,

    /// Search radius in km (defaults to CLINICFIND_SEARCH_RADIUS_KM)
    #[arg(long)]
    pub radius_km: Option<f64>,

    /// Require a doctor with this specialization (repeatable; any match)
    #[arg(long = "specialization")]
    pub specializations: Vec<String>,

    /// Require this facility (repeatable; all must be present)
    #[arg(long = "facility")]
    pub facilities: Vec<String>,

    /// Only clinics listing at least one doctor
    #[arg(long)]
    pub doctor_available: bool,

    /// Only clinics with a doctor offering teleconsultation
    #[arg(long)]
    pub telemedicine: bool,

    /// Only clinics open at the current local time
    #[arg(long)]
    pub open_now: bool,

    /// Only clinics open on both Saturday and Sunday
    #[arg(long)]
    pub open_weekends: bool,

    /// Fetch every candidate's doctor roster before filtering
    #[arg(long)]
    pub enrich: bool,

    /// Print machine-readable JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub fn filter_state(&self) -> FilterState {
        FilterState {
            specializations: self.specializations.iter().cloned().collect(),
            facilities: self.facilities.iter().cloned().collect(),
            doctor_available: self.doctor_available,
            telemedicine: self.telemedicine,
            open_now: self.open_now,
            open_weekends: self.open_weekends,
        }
    }

    pub fn refinement(&self) -> Option<RegionHint> {
        let hint = RegionHint {
            city: self.city.clone(),
            region: self.region.clone(),
        };
        (!hint.is_empty()).then_some(hint)
    }

    /// # Errors
    ///
    /// Returns an error if `--radius-km` is not a positive finite number.
    pub fn radius_km(&self, config: &AppConfig) -> anyhow::Result<f64> {
        let radius = self.radius_km.unwrap_or(config.search_radius_km);
        if !radius.is_finite() || radius <= 0.0 {
            anyhow::bail!("--radius-km must be a positive number, got {radius}");
        }
        Ok(radius)
    }
}

#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    location: Option<&'a ResolvedLocation>,
    radius_km: Option<f64>,
    facets: &'a FacetOptions,
    clinics: Vec<ClinicView<'a>>,
}

#[derive(Debug, Serialize)]
struct ClinicView<'a> {
    #[serde(flatten)]
    ranked: &'a RankedClinic,
    /// `None` until the roster has been fetched.
    doctors: Option<&'a [DoctorDetail]>,
}

/// Run one discovery query and print the filtered result.
///
/// # Errors
///
/// Returns an error if arguments are invalid, a client cannot be built, or
/// the clinic search fails. Location and roster failures are reported and
/// degrade the output instead.
pub(crate) async fn run_search(config: &AppConfig, args: &SearchArgs) -> anyhow::Result<()> {
    let radius_km = args.radius_km(config)?;
    let filter = args.filter_state();
    let resolver = build_resolver(config, &args.position)?;
    let client = Arc::new(ClinicApiClient::from_config(config)?);

    let discovery = discover(&resolver, client.as_ref(), radius_km, args.refinement()).await?;
    if let Err(unavailable) = &discovery.location {
        eprintln!("warning: {unavailable}; showing results without distance filtering");
    }

    let cache = DetailCache::with_shared_source(Arc::clone(&client));
    if args.enrich || filter.needs_doctor_details() {
        enrich_candidates(&cache, &discovery.candidates, config.enrich_concurrency).await;
    }
    let snapshot = cache.snapshot();
    cache.log_stats();

    let facets = discovery.facets(&snapshot);
    let now = chrono::Local::now().naive_local();
    let visible = discovery.visible(&filter, &snapshot, now);

    if args.json {
        let output = SearchOutput {
            location: discovery.location.as_ref().ok(),
            radius_km: discovery.is_distance_bounded().then_some(radius_km),
            facets: &facets,
            clinics: visible
                .iter()
                .map(|ranked| ClinicView {
                    ranked,
                    doctors: snapshot.get(&ranked.clinic.id),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &discovery.location {
        Ok(resolved) => println!(
            "location: {}  radius: {radius_km} km",
            describe_location(resolved)
        ),
        Err(_) => println!("location: unknown (distance filtering disabled)"),
    }
    print_facets(&facets);
    println!(
        "\n{} of {} clinics match",
        visible.len(),
        discovery.candidates.len()
    );
    for (index, ranked) in visible.iter().enumerate() {
        println!(
            "{:>3}. {:<40} {:>9}  {}",
            index + 1,
            ranked.clinic.name,
            format_distance(ranked.distance_km),
            ranked.clinic.city.as_deref().unwrap_or("")
        );
        println!(
            "     doctors: {}",
            roster_summary(ranked, &snapshot, cache.state(&ranked.clinic.id))
        );
        if !ranked.clinic.facilities.is_empty() {
            let facilities: Vec<&str> =
                ranked.clinic.facilities.iter().map(String::as_str).collect();
            println!("     facilities: {}", facilities.join(", "));
        }
    }

    Ok(())
}

/// Fetch rosters for every candidate that lists doctors, bounded by `concurrency`.
async fn enrich_candidates(
    cache: &DetailCache<ClinicApiClient>,
    candidates: &[RankedClinic],
    concurrency: usize,
) {
    let results: Vec<bool> = stream::iter(candidates.iter().filter(|r| r.clinic.has_doctors()))
        .map(|ranked| async move { cache.ensure(&ranked.clinic.id).await.is_ok() })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let failed = results.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        eprintln!("warning: {failed} of {} doctor rosters unavailable", results.len());
    }
}

fn print_facets(facets: &FacetOptions) {
    let join = |values: &std::collections::BTreeSet<String>| {
        if values.is_empty() {
            "\u{2014}".to_string()
        } else {
            values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        }
    };
    println!("specializations: {}", join(&facets.specializations));
    println!("facilities:      {}", join(&facets.facilities));
    println!(
        "telemedicine: {}  doctors listed: {}  weekend hours: {}",
        yes_no(facets.has_telemedicine),
        yes_no(facets.has_doctors),
        yes_no(facets.has_weekend_hours)
    );
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn format_distance(distance_km: Option<f64>) -> String {
    distance_km.map_or_else(|| "\u{2014}".to_string(), |d| format!("{d:.1} km"))
}

fn roster_summary(
    ranked: &RankedClinic,
    snapshot: &DetailSnapshot,
    state: Option<EntryState>,
) -> String {
    if let Some(doctors) = snapshot.get(&ranked.clinic.id) {
        let mut specializations: Vec<&str> = doctors
            .iter()
            .filter_map(|d| d.specialization.as_deref())
            .collect();
        specializations.sort_unstable();
        specializations.dedup();
        let tele = doctors.iter().filter(|d| d.available_for_teleconsultation).count();
        return format!(
            "{} ({}; {tele} teleconsult)",
            doctors.len(),
            if specializations.is_empty() {
                "no specializations listed".to_string()
            } else {
                specializations.join(", ")
            }
        );
    }
    let listed = ranked.clinic.doctor_refs.len();
    match state {
        Some(EntryState::Failed { .. }) => format!("{listed} (details unavailable)"),
        _ if listed == 0 => "none listed".to_string(),
        _ => format!("{listed} (details not loaded)"),
    }
}

#[cfg(test)]
mod tests {
    use clinicfind_core::{ClinicId, ClinicRecord, DoctorId};

    use super::*;

    fn ranked(id: &str, refs: &[&str]) -> RankedClinic {
        let mut clinic = ClinicRecord::new(id, id);
        clinic.doctor_refs = refs.iter().map(|r| DoctorId::from(*r)).collect();
        RankedClinic {
            clinic,
            distance_km: Some(4.83),
        }
    }

    #[test]
    fn filter_state_maps_every_flag() {
        let args = SearchArgs {
            specializations: vec!["Cardiology".into(), "Cardiology".into()],
            facilities: vec!["Lab".into()],
            telemedicine: true,
            open_weekends: true,
            ..SearchArgs::default()
        };
        let filter = args.filter_state();
        assert_eq!(filter.specializations.len(), 1);
        assert!(filter.facilities.contains("Lab"));
        assert!(filter.telemedicine && filter.open_weekends);
        assert!(!filter.open_now && !filter.doctor_available);
    }

    #[test]
    fn refinement_is_none_without_city_or_region() {
        assert!(SearchArgs::default().refinement().is_none());
        let args = SearchArgs {
            region: Some("Karnataka".into()),
            ..SearchArgs::default()
        };
        assert_eq!(args.refinement().unwrap().region.as_deref(), Some("Karnataka"));
    }

    #[test]
    fn distance_formatting() {
        assert_eq!(format_distance(Some(4.83)), "4.8 km");
        assert_eq!(format_distance(None), "\u{2014}");
    }

    #[test]
    fn roster_summary_reflects_cache_state() {
        let clinic = ranked("c1", &["d1", "d2"]);
        let empty = DetailSnapshot::default();
        assert_eq!(roster_summary(&clinic, &empty, None), "2 (details not loaded)");
        assert_eq!(
            roster_summary(
                &clinic,
                &empty,
                Some(EntryState::Failed {
                    reason: "503".into()
                })
            ),
            "2 (details unavailable)"
        );
        assert_eq!(roster_summary(&ranked("c2", &[]), &empty, None), "none listed");

        let snapshot: DetailSnapshot = [(
            ClinicId::from("c1"),
            vec![
                DoctorDetail::new("d1", Some("Cardiology"), true),
                DoctorDetail::new("d2", Some("Cardiology"), false),
            ],
        )]
        .into_iter()
        .collect();
        assert_eq!(
            roster_summary(&clinic, &snapshot, None),
            "2 (Cardiology; 1 teleconsult)"
        );
    }
}
