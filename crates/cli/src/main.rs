use clap::{Parser, Subcommand};
use mockd_models::{CreateEndpointRequest, EndpointDefinition, ListEndpointsResponse, Method};
use reqwest::Client;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "mockd-cli")]
#[command(about = "CLI tool for Mockd")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = "http://localhost:8080")]
    endpoint: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or replace an endpoint definition
    Create {
        /// Request path to mock, e.g. /users
        path: String,
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// Canned response body (JSON string)
        #[arg(long, default_value = "{}")]
        response: String,
        /// HTTP status code
        #[arg(long, default_value = "200")]
        status: u16,
        /// Shared-secret auth key required in the Authorization header
        #[arg(long)]
        auth_key: Option<String>,
        /// Validation schema (JSON string of field rules)
        #[arg(long)]
        schema: Option<String>,
        /// Upstream URL to proxy to instead of responding
        #[arg(long)]
        upstream: Option<String>,
    },
    /// List endpoint definitions
    List,
    /// Get one endpoint definition
    Get {
        /// Endpoint id
        id: i64,
    },
    /// Delete an endpoint definition
    Delete {
        /// Endpoint id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Create {
            path,
            method,
            response,
            status,
            auth_key,
            schema,
            upstream,
        } => {
            create_endpoint(
                &client,
                &cli.endpoint,
                CreateEndpointParams {
                    path,
                    method,
                    response,
                    status,
                    auth_key,
                    schema,
                    upstream,
                },
            )
            .await?;
        }
        Commands::List => {
            list_endpoints(&client, &cli.endpoint).await?;
        }
        Commands::Get { id } => {
            get_endpoint(&client, &cli.endpoint, id).await?;
        }
        Commands::Delete { id } => {
            delete_endpoint(&client, &cli.endpoint, id).await?;
        }
    }

    Ok(())
}

#[derive(Debug)]
struct CreateEndpointParams {
    path: String,
    method: String,
    response: String,
    status: u16,
    auth_key: Option<String>,
    schema: Option<String>,
    upstream: Option<String>,
}

async fn create_endpoint(
    client: &Client,
    endpoint: &str,
    params: CreateEndpointParams,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Creating endpoint: {} {}", params.method, params.path);

    let method: Method = params.method.parse()?;
    let response_body: serde_json::Value = serde_json::from_str(&params.response)?;
    let schema = params
        .schema
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    let request = CreateEndpointRequest {
        path: params.path,
        method,
        response: response_body,
        status: Some(params.status),
        auth_key: params.auth_key,
        schema,
        upstream: params.upstream,
    };

    let response = client
        .post(format!("{endpoint}/create"))
        .json(&request)
        .send()
        .await?;

    if response.status().is_success() {
        println!("Endpoint created:");
        println!("   Path: {}", request.path);
        println!("   Method: {}", request.method);
        println!("   Status: {}", params.status);
        if let Some(upstream) = &request.upstream {
            println!("   Upstream: {upstream}");
        }
    } else {
        let error_text = response.text().await?;
        error!("Failed to create endpoint: {}", error_text);
        return Err(error_text.into());
    }

    Ok(())
}

async fn list_endpoints(client: &Client, endpoint: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Listing endpoints");

    let response = client
        .get(format!("{endpoint}/endpoints"))
        .send()
        .await?;

    if response.status().is_success() {
        let list_response: ListEndpointsResponse = response.json().await?;
        println!("Endpoints:");
        for definition in list_response.endpoints {
            let mode = if definition.upstream.is_some() {
                "proxy"
            } else {
                "static"
            };
            println!(
                "   [{}] {} {} -> {} ({})",
                definition.id, definition.method, definition.path, definition.status, mode
            );
        }
    } else {
        let error_text = response.text().await?;
        error!("Failed to list endpoints: {}", error_text);
        return Err(error_text.into());
    }

    Ok(())
}

async fn get_endpoint(
    client: &Client,
    endpoint: &str,
    id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Getting endpoint {}", id);

    let response = client
        .get(format!("{endpoint}/endpoints/{id}"))
        .send()
        .await?;

    if response.status().is_success() {
        let definition: EndpointDefinition = response.json().await?;
        println!("{}", serde_json::to_string_pretty(&definition)?);
    } else {
        let error_text = response.text().await?;
        error!("Failed to get endpoint {}: {}", id, error_text);
        return Err(error_text.into());
    }

    Ok(())
}

async fn delete_endpoint(
    client: &Client,
    endpoint: &str,
    id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Deleting endpoint {}", id);

    let response = client
        .delete(format!("{endpoint}/delete/{id}"))
        .send()
        .await?;

    if response.status().is_success() {
        println!("Endpoint {id} deleted");
    } else {
        let error_text = response.text().await?;
        error!("Failed to delete endpoint {}: {}", id, error_text);
        return Err(error_text.into());
    }

    Ok(())
}
