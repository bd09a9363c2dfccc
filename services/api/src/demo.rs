use crate::infra::{build_pipeline_service, MemoryPipeline};
use chrono::Local;
use clap::Args;
use lead_pipeline::config::read_scoring_config;
use lead_pipeline::error::AppError;
use lead_pipeline::pipeline::{
    ImportReport, Lead, LeadField, RuleCondition, RuleValue, ScoreCard, ScoringConfig,
    ScoringFieldConfig, ScoringRule, TenantId,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

const SAMPLE_LEADS: &str = "\
Name,Email,Company,Status,Category,Location,Title,Industry,Source
Priya Raman,priya@lumenlabs.io,Lumen Labs,Qualified,Enterprise,Austin,CTO,Technology,Referral
Marco Ruiz,marco@harborfreight.co,Harbor Freight Co,Contacted,Mid-Market,Tampa,Operations Manager,Logistics,Webinar
Dana Whitfield,dana@northwind.com,Northwind,Proposal,Enterprise,Chicago,Director of Finance,Finance,Outbound
Sam Lee,,Initech,New,SMB,,Engineer,Software,Inbound
Ana Costa,ana@verde.health,Verde Health,Proposal,Mid-Market,Lisbon,CEO,Healthcare,Referral
,nobody@example.com,Ghost LLC,New,SMB,,,,
Jo Park,jo@parkandco.com,Park & Co,Negotiation,SMB,Seattle,Owner,Retail,Inbound
";

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// CSV export of leads (Name, Status, Title, Industry, ... headers)
    #[arg(long)]
    pub(crate) leads: PathBuf,
    /// JSON scoring configuration (defaults to the built-in configuration)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Only print the highest scoring N leads
    #[arg(long)]
    pub(crate) top: Option<usize>,
    /// Print the per-field breakdown for every printed lead
    #[arg(long)]
    pub(crate) breakdown: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Tenant identifier used for the walkthrough
    #[arg(long, default_value = "demo")]
    pub(crate) tenant: String,
    /// Optional CSV export to import instead of the bundled sample leads
    #[arg(long)]
    pub(crate) leads: Option<PathBuf>,
    /// Skip the stage deletion portion of the demo
    #[arg(long)]
    pub(crate) skip_stage_changes: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        leads,
        config,
        top,
        breakdown,
    } = args;

    let tenant = TenantId("cli".to_string());
    let service = build_pipeline_service();
    if let Some(path) = config {
        let scoring = read_scoring_config(&path)?;
        service.replace_scoring_config(&tenant, scoring)?;
    }

    let reader = BufReader::new(File::open(&leads)?);
    let report = service.import_leads(&tenant, reader)?;

    println!(
        "Scored {} leads from {} at {}",
        report.created.len(),
        leads.display(),
        Local::now().format("%Y-%m-%d %H:%M")
    );

    let mut ranked = report.created.clone();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    let limit = top.unwrap_or(ranked.len());
    for lead in ranked.iter().take(limit) {
        print_lead(lead);
        if breakdown {
            match service.score_card(&tenant, &lead.id) {
                Ok(card) => print_score_card(&card),
                Err(err) => println!("    breakdown unavailable: {}", err),
            }
        }
    }

    print_rejections(&report);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        tenant,
        leads,
        skip_stage_changes,
    } = args;

    let tenant = TenantId(tenant);
    let service = build_pipeline_service();

    println!("Lead pipeline demo for tenant '{}'", tenant);
    let stages = service.stages(&tenant)?;
    println!(
        "Pipeline stages: {}",
        stages
            .iter()
            .map(|stage| stage.name.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    let report = match leads {
        Some(path) => service.import_leads(&tenant, BufReader::new(File::open(path)?))?,
        None => service.import_leads(&tenant, SAMPLE_LEADS.as_bytes())?,
    };
    println!("\nImported leads under the default configuration");
    print_ranked(&report.created);
    print_rejections(&report);

    println!("\nReplacing the configuration with a stage-and-title focused one");
    let replacement = service.replace_scoring_config(&tenant, focused_config())?;
    println!(
        "- rescanned {} leads | {} rescored | {} warnings",
        replacement.rescan.scanned,
        replacement.rescan.rescored,
        replacement.rescan.warnings.len()
    );
    for warning in &replacement.rescan.warnings {
        println!("  ! {:?}: {}", warning.kind, warning.detail);
    }
    print_ranked(&service.leads(&tenant)?);

    if let Some(top) = best_lead(&service, &tenant)? {
        println!("\nScore card for {}", top.name);
        match service.score_card(&tenant, &top.id) {
            Ok(card) => print_score_card(&card),
            Err(err) => println!("  Score card unavailable: {}", err),
        }
    }

    if skip_stage_changes {
        return Ok(());
    }

    println!("\nDeleting the 'proposal' stage");
    let deletion = service.delete_stage(&tenant, "proposal")?;
    println!(
        "- {} leads moved to '{}'",
        deletion.rescan.reassigned,
        deletion.fallback.as_deref().unwrap_or("(none)")
    );
    print_ranked(&service.leads(&tenant)?);

    let stale = service.stale_leads(&tenant);
    if stale.is_empty() {
        println!("\nAll lead scores are current");
    } else {
        println!("\n{} leads are waiting for a rescore", stale.len());
    }

    Ok(())
}

fn best_lead(service: &MemoryPipeline, tenant: &TenantId) -> Result<Option<Lead>, AppError> {
    Ok(service
        .leads(tenant)?
        .into_iter()
        .max_by(|a, b| a.score.cmp(&b.score).then_with(|| b.name.cmp(&a.name))))
}

fn focused_config() -> ScoringConfig {
    let rule = |id: &str, condition: RuleCondition, value: RuleValue, points: i32| ScoringRule {
        id: id.to_string(),
        condition,
        value,
        points,
    };
    let text = |value: &str| RuleValue::Text(value.to_string());

    ScoringConfig {
        fields: vec![
            ScoringFieldConfig {
                field_name: LeadField::Status,
                label: String::new(),
                is_active: true,
                weight: 60,
                rules: vec![
                    rule("won", RuleCondition::Equals, text("won"), 10),
                    rule("proposal", RuleCondition::Equals, text("proposal"), 8),
                    rule("qualified", RuleCondition::Equals, text("qualified"), 6),
                    rule("contacted", RuleCondition::Equals, text("contacted"), 3),
                ],
            },
            ScoringFieldConfig {
                field_name: LeadField::Designation,
                label: "Job Title".to_string(),
                is_active: true,
                weight: 40,
                rules: vec![
                    rule(
                        "c-suite",
                        RuleCondition::IsOneOf,
                        RuleValue::List(vec![
                            "CEO".to_string(),
                            "CTO".to_string(),
                            "Owner".to_string(),
                        ]),
                        10,
                    ),
                    rule("director", RuleCondition::Contains, text("director"), 7),
                ],
            },
            ScoringFieldConfig {
                field_name: LeadField::Industry,
                label: String::new(),
                is_active: false,
                weight: 20,
                rules: vec![rule(
                    "healthcare",
                    RuleCondition::Equals,
                    text("healthcare"),
                    10,
                )],
            },
        ],
    }
}

fn print_ranked(leads: &[Lead]) {
    let mut ranked = leads.to_vec();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    for lead in &ranked {
        print_lead(lead);
    }
}

fn print_lead(lead: &Lead) {
    println!(
        "  {:>3}  {:<16} {:<10} {}",
        lead.score,
        lead.name,
        lead.status,
        lead.company.as_deref().unwrap_or("-")
    );
}

fn print_score_card(card: &ScoreCard) {
    println!(
        "    weighted {:.2} of {:.2} -> {}",
        card.weighted_score, card.max_weighted_score, card.score
    );
    for field in &card.fields {
        let matched = if field.matched_rules.is_empty() {
            "no rule matched".to_string()
        } else {
            field.matched_rules.join(", ")
        };
        println!(
            "    - {} (weight {}): {}/{} pts [{}]",
            field.label, field.weight, field.points, field.max_points, matched
        );
    }
}

fn print_rejections(report: &ImportReport) {
    if report.rejected.is_empty() {
        return;
    }
    println!("  Skipped rows:");
    for rejection in &report.rejected {
        println!("    - row {}: {}", rejection.row, rejection.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_leads_import_with_expected_rejections() {
        let service = build_pipeline_service();
        let tenant = TenantId("demo".to_string());

        let report = service
            .import_leads(&tenant, SAMPLE_LEADS.as_bytes())
            .expect("sample imports");

        assert_eq!(report.created.len(), 5);
        let rows: Vec<usize> = report.rejected.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![6, 7]);
    }

    #[test]
    fn focused_config_validates() {
        focused_config().validate().expect("demo config is valid");
    }

    #[test]
    fn demo_runs_end_to_end() {
        run_demo(DemoArgs {
            tenant: "demo".to_string(),
            leads: None,
            skip_stage_changes: false,
        })
        .expect("demo completes");
    }
}
