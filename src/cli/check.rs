use clap::Args;
use quarry_core::allow::AllowList;
use quarry_core::iam::RoleTable;
use quarry_core::provider::Provider;
use quarry_core::schema::discover;
use serde_json::json;

use crate::dbs::DatabaseArguments;
use crate::err::Error;

#[derive(Args, Debug)]
pub struct CheckCommandArguments {
	#[command(flatten)]
	db: DatabaseArguments,
	#[arg(help = "Output the full schema model and allow-list as JSON")]
	#[arg(long, default_value_t = false)]
	json: bool,
}

pub async fn init(
	CheckCommandArguments {
		db,
		json,
	}: CheckCommandArguments,
) -> Result<(), Error> {
	let provider = db.provider();
	let config = provider.config().await?;
	let blocklist = config.blocklist()?;
	// Discover the live schema
	let source = db.connect().await?;
	let schema = discover(source.as_ref(), &blocklist).await?;
	let roles = RoleTable::build(&config.roles, &schema, config.default_block)?;
	let allow = match config.disable_allow_list {
		true => AllowList::default(),
		false => AllowList::new(provider.allow_list().await?),
	};
	info!("Discovered {} tables and {} functions", schema.tables.len(), schema.functions.len());

	if json {
		let report = json!({
			"hash": format!("{:016x}", schema.hash()),
			"schema": schema,
			"roles": roles.names(),
			"queries": allow.entries(),
		});
		println!("{}", serde_json::to_string_pretty(&report)?);
		return Ok(());
	}

	println!("{} database {}.{} (version {})", schema.kind, schema.name, schema.schema, schema.version);
	println!("schema hash {:016x}", schema.hash());
	println!("\ntables:");
	for table in &schema.tables {
		let blocked = if table.blocked {
			" [blocked]"
		} else {
			""
		};
		println!(
			"  {}.{} ({}, {} columns){blocked}",
			table.schema,
			table.name,
			table.kind,
			table.columns.len()
		);
	}
	println!("\nfunctions:");
	for function in &schema.functions {
		let params: Vec<String> =
			function.params.iter().map(|p| format!("{} {}", p.name, p.kind)).collect();
		println!("  {}({})", function.name, params.join(", "));
	}
	println!("\nroles: {}", roles.names().join(", "));
	println!("\nallow-listed queries:");
	for entry in allow.entries() {
		match &entry.item.order {
			Some(order) => println!(
				"  {} {} (order by ${}: {})",
				entry.operation,
				entry.name,
				order.var,
				order.values.join(", ")
			),
			None => println!("  {} {}", entry.operation, entry.name),
		}
	}
	Ok(())
}
