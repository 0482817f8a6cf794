use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use ward_core::{
    Actor, ActorRole, CoreConfig, Gender, PatientDraft, PatientStatus, PatientUpdate, RecordId,
    WardDraft, WardService, WardType,
};

#[derive(Parser)]
#[command(name = "ward")]
#[command(about = "Hospital ward occupancy CLI")]
struct Cli {
    /// Directory holding persisted ward and patient documents
    #[arg(long, env = "WARD_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Identifier of the user performing the operation
    #[arg(long, env = "WARD_ACTOR_ID", default_value = "cli", global = true)]
    actor_id: String,

    /// Display name of the user performing the operation
    #[arg(long, env = "WARD_ACTOR_NAME", default_value = "Command Line", global = true)]
    actor_name: String,

    /// Role of the user performing the operation
    #[arg(long, env = "WARD_ACTOR_ROLE", default_value = "admin", global = true)]
    actor_role: ActorRole,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all wards
    ListWards,
    /// Create a ward
    CreateWard {
        /// Ward name
        name: String,
        /// Department the ward belongs to
        department: String,
        /// Number of beds
        total_beds: u32,
        /// Ward type (general, icu, emergency, surgery, maternity, pediatric)
        #[arg(long, default_value = "general")]
        ward_type: WardType,
    },
    /// List all patients
    ListPatients,
    /// Register a patient and admit them to a ward
    Admit {
        /// Ward UUID
        ward_id: String,
        /// Patient name
        name: String,
        /// Age in years
        age: u32,
        /// Gender (male, female, other)
        gender: Gender,
        /// Contact phone number
        phone: String,
        /// Home address
        address: String,
        /// Working diagnosis
        #[arg(long, default_value = "")]
        diagnosis: String,
        /// Bed number within the ward
        #[arg(long)]
        bed: Option<String>,
    },
    /// Move an admitted patient to another ward
    Transfer {
        /// Patient UUID
        patient_id: String,
        /// Destination ward UUID
        ward_id: String,
    },
    /// Discharge a patient, freeing their bed
    Discharge {
        /// Patient UUID
        patient_id: String,
    },
    /// Print dashboard statistics
    Stats,
    /// Compare recorded ward occupancy against admitted patients
    Audit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ward_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'ward --help' for commands");
        return Ok(());
    };

    let cfg = CoreConfig::from_env_values(
        cli.data_dir.map(|dir| dir.display().to_string()),
        std::env::var("WARD_TX_MAX_ATTEMPTS").ok(),
        std::env::var("WARD_TX_TIMEOUT_MS").ok(),
    )?;
    if let (Some(wards), Some(patients)) = (cfg.wards_dir(), cfg.patients_dir()) {
        tracing::debug!(
            "using ward documents in {} and patient documents in {}",
            wards.display(),
            patients.display()
        );
    } else {
        eprintln!("Warning: no data directory configured; changes will not be saved.");
    }
    let service = WardService::open(Arc::new(cfg))?;
    let actor = Actor::new(&cli.actor_id, &cli.actor_name, cli.actor_role)?;

    match command {
        Commands::ListWards => {
            let wards = service.wards().list_wards().await;
            if wards.is_empty() {
                println!("No wards found.");
            } else {
                for ward in wards {
                    println!(
                        "ID: {}, Name: {}, Type: {}, Beds: {}/{} occupied",
                        ward.id, ward.name, ward.ward_type, ward.occupied_beds, ward.total_beds
                    );
                }
            }
        }
        Commands::CreateWard {
            name,
            department,
            total_beds,
            ward_type,
        } => {
            let draft = WardDraft {
                name,
                department,
                ward_type,
                total_beds,
            };
            match service.wards().create_ward(draft).await {
                Ok(id) => println!("Created ward with UUID: {}", id),
                Err(e) => eprintln!("Error creating ward: {}", e),
            }
        }
        Commands::ListPatients => {
            let patients = service.patients().list_patients().await;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    let ward = patient
                        .ward_id
                        .as_ref()
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".into());
                    println!(
                        "ID: {}, Name: {}, Status: {}, Ward: {}",
                        patient.id, patient.name, patient.status, ward
                    );
                }
            }
        }
        Commands::Admit {
            ward_id,
            name,
            age,
            gender,
            phone,
            address,
            diagnosis,
            bed,
        } => {
            let draft = PatientDraft {
                name,
                age,
                gender,
                phone,
                email: None,
                address,
                emergency_contact: None,
                status: PatientStatus::Admitted,
                ward_id: Some(RecordId::parse(&ward_id)?),
                bed_number: bed,
                diagnosis,
                procedure: None,
                doctor_id: None,
                doctor_name: None,
                admission_date: None,
            };
            match service.occupancy().create_patient(&actor, draft).await {
                Ok(id) => println!("Admitted patient with UUID: {}", id),
                Err(e) => eprintln!("Error admitting patient: {}", e),
            }
        }
        Commands::Transfer {
            patient_id,
            ward_id,
        } => {
            let patient_id = RecordId::parse(&patient_id)?;
            let update = PatientUpdate {
                ward_id: Some(Some(RecordId::parse(&ward_id)?)),
                ..PatientUpdate::default()
            };
            match service
                .occupancy()
                .update_patient(&actor, &patient_id, update)
                .await
            {
                Ok(()) => println!("Transferred patient {} to ward {}", patient_id, ward_id),
                Err(e) => eprintln!("Error transferring patient: {}", e),
            }
        }
        Commands::Discharge { patient_id } => {
            let patient_id = RecordId::parse(&patient_id)?;
            let update = PatientUpdate {
                status: Some(PatientStatus::Discharged),
                ..PatientUpdate::default()
            };
            match service
                .occupancy()
                .update_patient(&actor, &patient_id, update)
                .await
            {
                Ok(()) => println!("Discharged patient {}", patient_id),
                Err(e) => eprintln!("Error discharging patient: {}", e),
            }
        }
        Commands::Stats => {
            let stats = service.projections().dashboard_stats().await;
            println!(
                "Patients: {} total, {} admitted, {} critical",
                stats.total_patients, stats.admitted_patients, stats.critical_patients
            );
            println!("Admissions today: {}", stats.admissions_today);
            println!("Pending procedures: {}", stats.pending_procedures);
            println!(
                "Beds: {}/{} occupied across {} wards ({:.1}%)",
                stats.occupied_beds, stats.total_beds, stats.total_wards, stats.occupancy_rate
            );
        }
        Commands::Audit => {
            let audit = service.projections().occupancy_audit().await;
            for ward in &audit.wards {
                let marker = if ward.drifted { "DRIFT" } else { "ok" };
                println!(
                    "{:<5} {} ({}): recorded {}, admitted {}",
                    marker, ward.name, ward.ward_id, ward.recorded_occupied, ward.actual_admitted
                );
            }
            if audit.orphaned_admissions > 0 {
                println!("Admitted patients without a ward: {}", audit.orphaned_admissions);
            }
            println!(
                "Occupancy is {}",
                if audit.consistent { "consistent" } else { "inconsistent" }
            );
        }
    }

    Ok(())
}
