use crate::cli::{ImportCommand, OptimizeArgs, ResidentCommand, ShopCommand};
use crate::infra::{build_relay, image_request, open_roster, snapshot_path, FileRosterService};
use std::fs::File;
use std::path::{Path, PathBuf};
use tower_staffing::config::AppConfig;
use tower_staffing::error::AppError;
use tower_staffing::workflows::import::{
    parse_csv_candidates, parse_model_text, ImportAction, ImportPreviewRow,
};
use tower_staffing::workflows::optimizer::StaffingReport;
use tower_staffing::workflows::roster::{
    Category, NewResident, NewShop, PartialSkills, ResidentUpdate, Roster, ShopUpdate, SkillSet,
};

fn open(snapshot: Option<PathBuf>) -> Result<(AppConfig, FileRosterService), AppError> {
    let config = AppConfig::load()?;
    let path = snapshot_path(&config, snapshot);
    let service = open_roster(&path)?;
    Ok((config, service))
}

pub(crate) fn run_resident(
    command: ResidentCommand,
    snapshot: Option<PathBuf>,
) -> Result<(), AppError> {
    let (_, service) = open(snapshot)?;

    match command {
        ResidentCommand::Add(args) => {
            let resident = service.add_resident(NewResident {
                name: args.name,
                skills: partial_skills(&args.skills).complete(),
                dream_job: args.dream_job,
            })?;
            println!(
                "Added resident {} (id {}): {}",
                resident.name,
                resident.id,
                format_skills(&resident.skills)
            );
        }
        ResidentCommand::Update(args) => {
            let id = service.roster()?.find_resident(&args.target)?;
            let skills = (!args.skills.is_empty()).then(|| partial_skills(&args.skills));
            let resident = service.update_resident(
                id,
                ResidentUpdate {
                    skills,
                    dream_job: args.dream_job,
                },
            )?;
            println!(
                "Updated resident {}: {}",
                resident.name,
                format_skills(&resident.skills)
            );
        }
        ResidentCommand::Remove { target } => {
            let id = service.roster()?.find_resident(&target)?;
            let resident = service.remove_resident(id)?;
            println!("Removed resident {}", resident.name);
        }
        ResidentCommand::List => print!("{}", render_residents(&service.roster()?)),
    }

    Ok(())
}

pub(crate) fn run_shop(command: ShopCommand, snapshot: Option<PathBuf>) -> Result<(), AppError> {
    let (_, service) = open(snapshot)?;

    match command {
        ShopCommand::Add(args) => {
            let shop = service.add_shop(NewShop {
                name: args.name,
                category: args.category,
                capacity: args.capacity,
            })?;
            println!(
                "Added shop {} (id {}): {} with {} slots",
                shop.name, shop.id, shop.category, shop.capacity
            );
        }
        ShopCommand::Update(args) => {
            let id = service.roster()?.find_shop(&args.target)?;
            let shop = service.update_shop(
                id,
                ShopUpdate {
                    category: args.category,
                    capacity: args.capacity,
                },
            )?;
            println!(
                "Updated shop {}: {} with {} slots",
                shop.name, shop.category, shop.capacity
            );
        }
        ShopCommand::Remove { target } => {
            let id = service.roster()?.find_shop(&target)?;
            let shop = service.remove_shop(id)?;
            println!("Removed shop {}", shop.name);
        }
        ShopCommand::List => print!("{}", render_shops(&service.staffing()?)),
    }

    Ok(())
}

pub(crate) fn run_optimize(args: OptimizeArgs, snapshot: Option<PathBuf>) -> Result<(), AppError> {
    let (_, service) = open(snapshot)?;
    let report = service.optimize(args.lock_existing)?;
    print!("{}", render_report(&report));

    if let Some(path) = args.export_csv {
        export_csv(&report, &path)?;
        println!("\nAssignments written to {}", path.display());
    }
    Ok(())
}

pub(crate) fn run_report(snapshot: Option<PathBuf>) -> Result<(), AppError> {
    let (_, service) = open(snapshot)?;
    print!("{}", render_report(&service.staffing()?));
    Ok(())
}

pub(crate) async fn run_import(
    command: ImportCommand,
    snapshot: Option<PathBuf>,
) -> Result<(), AppError> {
    let (config, service) = open(snapshot)?;

    let (args, batch) = match command {
        ImportCommand::Json(args) => {
            let text = std::fs::read_to_string(&args.path)?;
            let batch = parse_model_text(&text)?;
            (args, batch)
        }
        ImportCommand::Csv(args) => {
            let batch = parse_csv_candidates(File::open(&args.path)?)?;
            (args, batch)
        }
        ImportCommand::Image(args) => {
            let request = image_request(&args.path)?;
            let relay = build_relay(&config.relay)?;
            println!("Scanning {}...", args.path.display());
            let text = relay.analyze(&request).await?;
            let batch = parse_model_text(&text)?;
            (args, batch)
        }
    };

    print!("{}", render_preview(&service.preview(&batch)?));
    if args.dry_run {
        println!("Dry run: roster unchanged");
        return Ok(());
    }

    let summary = service.import_batch(batch)?;
    println!("Import complete: {summary}");
    Ok(())
}

fn partial_skills(pairs: &[(Category, u8)]) -> PartialSkills {
    pairs
        .iter()
        .fold(PartialSkills::new(), |skills, (category, value)| {
            skills.with(*category, *value)
        })
}

fn format_skills(skills: &SkillSet) -> String {
    Category::ordered()
        .iter()
        .map(|category| format!("{} {}", category, skills.get(*category)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn render_residents(roster: &Roster) -> String {
    if roster.residents().is_empty() {
        return "No residents yet\n".to_string();
    }

    let mut out = String::new();
    for resident in roster.residents() {
        let shop = roster
            .assignments()
            .shop_of(resident.id)
            .and_then(|id| roster.shop(id))
            .map(|shop| shop.name.as_str())
            .unwrap_or("unplaced");
        out.push_str(&format!(
            "- [{}] {}: {} | works at {}",
            resident.id,
            resident.name,
            format_skills(&resident.skills),
            shop
        ));
        if let Some(dream) = &resident.dream_job {
            out.push_str(&format!(" | dreams of {dream}"));
        }
        out.push('\n');
    }
    out
}

pub(crate) fn render_shops(report: &StaffingReport) -> String {
    if report.shops.is_empty() {
        return "No shops yet\n".to_string();
    }

    report
        .shops
        .iter()
        .map(|shop| {
            format!(
                "- [{}] {} ({}): {}/{} slots filled\n",
                shop.shop_id,
                shop.name,
                shop.category,
                shop.workers.len(),
                shop.capacity
            )
        })
        .collect()
}

pub(crate) fn render_report(report: &StaffingReport) -> String {
    let metrics = &report.metrics;
    let mut out = format!(
        "Staffing: {}/{} slots filled | skill {} | efficiency {}%\n",
        metrics.filled_slots, metrics.total_slots, metrics.total_skill, metrics.efficiency_pct
    );

    for shop in &report.shops {
        out.push_str(&format!(
            "\n{} ({}) skill {}/{}\n",
            shop.name, shop.category, shop.skill_total, shop.skill_max
        ));
        for worker in &shop.workers {
            let dream = if worker.dream_job_match {
                " (dream job)"
            } else {
                ""
            };
            out.push_str(&format!(
                "  {}. {} {}{}\n",
                worker.slot + 1,
                worker.name,
                worker.skill,
                dream
            ));
        }
        for _ in 0..shop.open_slots {
            out.push_str("  - open slot\n");
        }
    }

    if report.has_unplaced() {
        out.push_str(&format!(
            "\nWarning: {} resident(s) without a shop: {}\n",
            metrics.unplaced,
            report.unplaced_residents.join(", ")
        ));
    }
    out
}

pub(crate) fn render_preview(rows: &[ImportPreviewRow]) -> String {
    let mut out = format!("Scanned {} resident(s)\n", rows.len());
    for row in rows {
        let action = match row.action {
            ImportAction::Create => "new",
            ImportAction::Update => "update",
        };
        let skills = row
            .skills
            .iter()
            .map(|(category, value)| format!("{category} {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("- [{action}] {}: {skills}", row.name));
        if let Some(dream) = &row.dream_job {
            out.push_str(&format!(" | dreams of {dream}"));
        }
        out.push('\n');
    }
    out
}

/// One row per filled slot, shops in declaration order.
pub(crate) fn export_csv(report: &StaffingReport, path: &Path) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    writer
        .write_record(["shop", "category", "slot", "resident", "skill", "dream_job_match"])
        .map_err(std::io::Error::from)?;

    for shop in &report.shops {
        for worker in &shop.workers {
            writer
                .write_record([
                    shop.name.clone(),
                    shop.category.to_string(),
                    (worker.slot + 1).to_string(),
                    worker.name.clone(),
                    worker.skill.to_string(),
                    worker.dream_job_match.to_string(),
                ])
                .map_err(std::io::Error::from)?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_staffing::workflows::import::validate_candidates;

    fn staffed_roster() -> Roster {
        let mut roster = Roster::new();
        roster
            .add_shop(NewShop {
                name: "Diner".to_string(),
                category: Category::Food,
                capacity: 3,
            })
            .expect("shop");
        for (name, food, dream) in [("Ada", 9, Some("Diner")), ("Cy", 7, None)] {
            roster
                .add_resident(NewResident {
                    name: name.to_string(),
                    skills: SkillSet::uniform(1).with(Category::Food, food),
                    dream_job: dream.map(str::to_string),
                })
                .expect("resident");
        }
        roster.optimize(false).expect("optimize");
        roster
    }

    #[test]
    fn report_lists_workers_open_slots_and_efficiency() {
        let report = StaffingReport::build(&staffed_roster());
        let text = render_report(&report);

        assert!(text.starts_with("Staffing: 2/3 slots filled | skill 16 | efficiency 89%"));
        assert!(text.contains("Diner (Food) skill 16/27"));
        assert!(text.contains("  1. Ada 9 (dream job)"));
        assert!(text.contains("  2. Cy 7\n"));
        assert!(text.contains("  - open slot"));
        assert!(!text.contains("Warning"));
    }

    #[test]
    fn report_warns_about_unplaced_residents() {
        let mut roster = staffed_roster();
        let diner = roster.find_shop("Diner").expect("diner");
        roster
            .update_shop(
                diner,
                ShopUpdate {
                    category: None,
                    capacity: Some(1),
                },
            )
            .expect("shrink");

        let text = render_report(&StaffingReport::build(&roster));
        assert!(text.contains("Warning: 1 resident(s) without a shop: Cy"));
    }

    #[test]
    fn resident_listing_shows_workplace_and_dream_job() {
        let text = render_residents(&staffed_roster());
        assert!(text.contains("Ada: Food 9, Service 1"));
        assert!(text.contains("works at Diner | dreams of Diner"));
        assert_eq!(render_residents(&Roster::new()), "No residents yet\n");
    }

    #[test]
    fn preview_marks_new_and_existing_residents() {
        let roster = staffed_roster();
        let batch = validate_candidates(&serde_json::json!([
            {"name": "ada", "skills": {"food": 8}},
            {"name": "Dee", "skills": {"retail": 6}, "fav": "Boutique"}
        ]))
        .expect("batch");
        let rows = tower_staffing::workflows::import::preview(&roster, &batch);

        let text = render_preview(&rows);
        assert!(text.contains("- [update] ada: Food 8"));
        assert!(text.contains("- [new] Dee: Retail 6 | dreams of Boutique"));
    }

    #[test]
    fn export_csv_writes_one_row_per_worker() {
        let report = StaffingReport::build(&staffed_roster());
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("staffing.csv");

        export_csv(&report, &path).expect("export");

        let written = std::fs::read_to_string(&path).expect("read back");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines,
            vec![
                "shop,category,slot,resident,skill,dream_job_match",
                "Diner,Food,1,Ada,9,true",
                "Diner,Food,2,Cy,7,false",
            ]
        );
    }
}
