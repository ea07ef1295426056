use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use log::{debug, error};

use employee_records::client::filter::{filter_employees, SearchBy};
use employee_records::client::view::{render_detail, render_table, ImageStatus};
use employee_records::client::{ApiClient, ClientError};
use employee_records::config::DEFAULT_SERVER_URL;
use employee_records::models::employee::{Address, CreateEmployeeRequest, EmployeeUpdate};

#[derive(Parser)]
#[command(name = "emp", about = "Browse and manage employee records")]
struct Cli {
    /// Base URL of the employee records API
    #[arg(long, env = "SERVER_URL", default_value = DEFAULT_SERVER_URL, global = true)]
    server_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all employees, optionally filtered locally
    List {
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SearchBy::Id)]
        by: SearchBy,
    },
    /// Show one employee and resolve their profile image
    View {
        id: String,
        #[arg(long)]
        save_image: Option<PathBuf>,
    },
    /// Delete an employee and their profile image
    Delete { id: String },
    /// Upload a profile image and print its id
    Upload { file: PathBuf },
    /// Create an employee
    Create(CreateArgs),
    /// Update the editable fields of an employee
    Update(UpdateArgs),
}

#[derive(Args)]
struct AddressArgs {
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    district: Option<String>,
    #[arg(long)]
    state: Option<String>,
}

impl AddressArgs {
    fn into_address(self) -> Option<Address> {
        if self.city.is_none() && self.district.is_none() && self.state.is_none() {
            return None;
        }
        Some(Address {
            city: self.city,
            district: self.district,
            state: self.state,
        })
    }
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long = "dob")]
    date_of_birth: String,
    #[arg(long = "doj")]
    date_of_joining: String,
    #[arg(long)]
    department: String,
    #[arg(long = "status")]
    employment_status: String,
    #[arg(long)]
    gender: String,
    #[arg(long)]
    marital: Option<String>,
    #[command(flatten)]
    address: AddressArgs,
    /// Id returned by an earlier `emp upload`
    #[arg(long, conflicts_with = "image")]
    image_id: Option<String>,
    /// Upload this file first and attach it
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Args)]
struct UpdateArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long = "status")]
    employment_status: Option<String>,
    #[arg(long)]
    marital: Option<String>,
    #[command(flatten)]
    address: AddressArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let client = match ApiClient::new(&cli.server_url) {
        Ok(client) => client,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(&client, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &ApiClient, command: Command) -> Result<(), ClientError> {
    match command {
        Command::List { search, by } => {
            list(client, search.as_deref(), by).await;
            Ok(())
        }
        Command::View { id, save_image } => view(client, &id, save_image.as_deref()).await,
        Command::Delete { id } => {
            let message = client.delete(&id).await?;
            println!("{}\n", message);
            list(client, None, SearchBy::Id).await;
            Ok(())
        }
        Command::Upload { file } => {
            let image_id = upload(client, &file).await?;
            println!("Image uploaded successfully! id: {}", image_id);
            Ok(())
        }
        Command::Create(args) => create(client, args).await,
        Command::Update(args) => {
            let update = EmployeeUpdate {
                name: args.name,
                phone: args.phone,
                department: args.department,
                employment_status: args.employment_status,
                marital: args.marital,
                address: args.address.into_address(),
            };
            let employee = client.update(&args.id, &update).await?;
            println!("Employee updated successfully\n");
            print!("{}", render_detail(&employee, &ImageStatus::None));
            Ok(())
        }
    }
}

/// Fetches once and filters locally; a failed fetch shows an empty list.
async fn list(client: &ApiClient, search: Option<&str>, by: SearchBy) {
    let employees = client.list().await.unwrap_or_else(|err| {
        error!("Error fetching employees: {}", err);
        Vec::new()
    });
    let shown = filter_employees(&employees, search.unwrap_or(""), by);
    println!("Employees Records\n");
    print!("{}", render_table(&shown));
}

async fn view(client: &ApiClient, id: &str, save_image: Option<&Path>) -> Result<(), ClientError> {
    let employee = client.detail(id).await?;

    let mut status = ImageStatus::None;
    if let Some(image_id) = employee.profile_image.as_deref() {
        status = match client.image(image_id).await {
            Ok(image) => {
                if let Some(path) = save_image {
                    if let Err(err) = tokio::fs::write(path, &image.data).await {
                        error!("Could not save image to {}: {}", path.display(), err);
                    }
                }
                ImageStatus::Available {
                    url: client.image_url(image_id).to_string(),
                    content_type: image.content_type,
                    size: image.data.len(),
                }
            }
            Err(err) => {
                debug!("Image {} unavailable: {}", image_id, err);
                ImageStatus::Failed
            }
        };
    }

    print!("{}", render_detail(&employee, &status));
    Ok(())
}

async fn upload(client: &ApiClient, file: &Path) -> Result<String, ClientError> {
    let data = match tokio::fs::read(file).await {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Please select a file first.");
            return Err(ClientError::File {
                path: file.display().to_string(),
                message: err.to_string(),
            });
        }
    };
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    client.upload(&filename, data).await.map_err(|err| {
        eprintln!("Image upload failed. Please try again.");
        err
    })
}

async fn create(client: &ApiClient, args: CreateArgs) -> Result<(), ClientError> {
    let image_id = match (&args.image, args.image_id) {
        (Some(path), _) => Some(upload(client, path).await?),
        (None, image_id) => image_id,
    };

    let request = CreateEmployeeRequest {
        name: Some(args.name),
        phone: Some(args.phone),
        date_of_birth: Some(args.date_of_birth),
        date_of_joining: Some(args.date_of_joining),
        department: Some(args.department),
        employment_status: Some(args.employment_status),
        marital: args.marital,
        gender: Some(args.gender),
        address: args.address.into_address(),
        image_id,
    };

    let employee = client.create(&request).await?;
    println!("Employee created with id {}\n", employee.employee_id);
    print!("{}", render_detail(&employee, &ImageStatus::None));
    Ok(())
}
