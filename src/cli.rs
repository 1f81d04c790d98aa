// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn user_arg() -> Arg {
    Arg::new("user")
        .long("user")
        .required(true)
        .help("Owning user name")
}

fn yes_flag() -> Arg {
    Arg::new("yes")
        .long("yes")
        .action(ArgAction::SetTrue)
        .help("Confirm the deletion")
}

fn with_json(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print a JSON payload instead of a table"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    )
}

fn user_cmd() -> Command {
    Command::new("user")
        .about("Manage user profiles")
        .subcommand(
            Command::new("register")
                .about("Register a user")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("phone").long("phone"))
                .arg(Arg::new("currency").long("currency").help("Preferred currency (default USD)"))
                .arg(Arg::new("avatar").long("avatar").help("Avatar image path")),
        )
        .subcommand(
            Command::new("show")
                .about("Show a user profile")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("update")
                .about("Update profile fields")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("phone").long("phone"))
                .arg(Arg::new("currency").long("currency"))
                .arg(Arg::new("avatar").long("avatar")),
        )
        .subcommand(Command::new("list").about("List users"))
        .subcommand(
            Command::new("rm")
                .about("Delete a user and everything they own")
                .arg(Arg::new("name").required(true))
                .arg(yes_flag()),
        )
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage shared categories")
        .subcommand(
            Command::new("add")
                .about("Add a category")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .help("income|expense (fixed at creation)"),
                )
                .arg(Arg::new("icon").long("icon"))
                .arg(Arg::new("color").long("color").help("Hex color, e.g. #3B82F6")),
        )
        .subcommand(
            Command::new("list").about("List categories").arg(
                Arg::new("all")
                    .long("all")
                    .action(ArgAction::SetTrue)
                    .help("Include inactive categories"),
            ),
        )
        .subcommand(
            Command::new("edit")
                .about("Edit display metadata or the active flag")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("icon").long("icon"))
                .arg(Arg::new("color").long("color"))
                .arg(Arg::new("active").long("active").help("true|false")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a category")
                .arg(Arg::new("name").required(true))
                .arg(yes_flag()),
        )
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and browse transactions")
        .subcommand(
            Command::new("add")
                .about("Record a transaction")
                .arg(user_arg())
                .arg(Arg::new("kind").long("kind").required(true).help("income|expense"))
                .arg(Arg::new("category").long("category").required(true))
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(Arg::new("date").long("date").help("YYYY-MM-DD (default today)"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(with_json(
            Command::new("list")
                .about("List transactions, newest first")
                .arg(user_arg())
                .arg(Arg::new("kind").long("kind"))
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("from").long("from").help("Earliest date, inclusive"))
                .arg(Arg::new("to").long("to").help("Latest date, inclusive"))
                .arg(
                    Arg::new("search")
                        .long("search")
                        .help("Match description or category name"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize)),
                ),
        ))
        .subcommand(
            Command::new("edit")
                .about("Edit a transaction you own")
                .arg(Arg::new("id").required(true).value_parser(value_parser!(i64)))
                .arg(user_arg())
                .arg(Arg::new("kind").long("kind"))
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("amount").long("amount"))
                .arg(Arg::new("date").long("date"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a transaction you own")
                .arg(Arg::new("id").required(true).value_parser(value_parser!(i64)))
                .arg(user_arg())
                .arg(yes_flag()),
        )
}

fn budget_cmd() -> Command {
    Command::new("budget")
        .about("Spending ceilings per category and period")
        .subcommand(
            Command::new("add")
                .about("Create a budget")
                .arg(user_arg())
                .arg(Arg::new("category").long("category").required(true))
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(
                    Arg::new("period")
                        .long("period")
                        .required(true)
                        .help("monthly|quarterly|yearly"),
                )
                .arg(Arg::new("start").long("start").help("YYYY-MM-DD (default today)"))
                .arg(Arg::new("end").long("end")),
        )
        .subcommand(with_json(
            Command::new("list")
                .about("List active budgets with spent/remaining/usage")
                .arg(user_arg()),
        ))
        .subcommand(
            Command::new("edit")
                .about("Edit a budget you own")
                .arg(Arg::new("id").required(true).value_parser(value_parser!(i64)))
                .arg(user_arg())
                .arg(Arg::new("amount").long("amount"))
                .arg(Arg::new("period").long("period"))
                .arg(Arg::new("start").long("start"))
                .arg(Arg::new("end").long("end"))
                .arg(Arg::new("active").long("active").help("true|false")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a budget you own")
                .arg(Arg::new("id").required(true).value_parser(value_parser!(i64)))
                .arg(user_arg())
                .arg(yes_flag()),
        )
}

fn recurring_cmd() -> Command {
    Command::new("recurring")
        .about("Recurring transaction templates (no scheduler: advance manually)")
        .subcommand(
            Command::new("add")
                .about("Create a template")
                .arg(user_arg())
                .arg(Arg::new("kind").long("kind").required(true).help("income|expense"))
                .arg(Arg::new("category").long("category").required(true))
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(
                    Arg::new("frequency")
                        .long("frequency")
                        .required(true)
                        .help("daily|weekly|monthly|quarterly|yearly"),
                )
                .arg(Arg::new("start").long("start").help("YYYY-MM-DD (default today)"))
                .arg(Arg::new("end").long("end"))
                .arg(
                    Arg::new("next")
                        .long("next")
                        .help("First occurrence (default: start date)"),
                )
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(with_json(
            Command::new("list")
                .about("List templates by next occurrence")
                .arg(user_arg()),
        ))
        .subcommand(
            Command::new("edit")
                .about("Edit a template you own")
                .arg(Arg::new("id").required(true).value_parser(value_parser!(i64)))
                .arg(user_arg())
                .arg(Arg::new("amount").long("amount"))
                .arg(Arg::new("description").long("description"))
                .arg(Arg::new("frequency").long("frequency"))
                .arg(Arg::new("end").long("end"))
                .arg(Arg::new("next").long("next"))
                .arg(Arg::new("active").long("active").help("true|false")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a template you own")
                .arg(Arg::new("id").required(true).value_parser(value_parser!(i64)))
                .arg(user_arg())
                .arg(yes_flag()),
        )
        .subcommand(
            Command::new("advance")
                .about("Move next occurrence forward one step")
                .arg(Arg::new("id").required(true).value_parser(value_parser!(i64)))
                .arg(user_arg()),
        )
}

fn report_cmd() -> Command {
    Command::new("report")
        .about("Aggregations for dashboards and charts")
        .subcommand(with_json(
            Command::new("stats")
                .about("Current-month totals vs. the previous month")
                .arg(user_arg()),
        ))
        .subcommand(with_json(
            Command::new("monthly-trend")
                .about("Income/expense per calendar month, oldest first")
                .arg(user_arg())
                .arg(
                    Arg::new("months")
                        .long("months")
                        .value_parser(value_parser!(usize))
                        .help("How many months back (default 12)"),
                ),
        ))
        .subcommand(with_json(
            Command::new("category-breakdown")
                .about("Expense totals per category")
                .arg(user_arg())
                .arg(
                    Arg::new("window")
                        .long("window")
                        .help("current-month|last-month|last-3-months|all-time"),
                ),
        ))
        .subcommand(with_json(
            Command::new("weekly-trend")
                .about("Week-of-year buckets for one kind")
                .arg(user_arg())
                .arg(Arg::new("kind").long("kind").help("income|expense (default expense)"))
                .arg(
                    Arg::new("window")
                        .long("window")
                        .help("1month|3months|6months|1year (default 6months)"),
                ),
        ))
}

fn export_cmd() -> Command {
    Command::new("export")
        .about("Downloadable report documents")
        .subcommand(
            Command::new("report")
                .about("Render filtered transactions to pdf|excel|csv")
                .arg(user_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .help("pdf|excel|csv (default pdf)"),
                )
                .arg(Arg::new("label").long("label").help("Report label (default summary)"))
                .arg(Arg::new("from").long("from"))
                .arg(Arg::new("to").long("to"))
                .arg(Arg::new("out").long("out").help("Output path (default: generated name)")),
        )
}

pub fn build_cli() -> Command {
    Command::new("extrackr")
        .about("Personal income/expense tracking, budgets, and report export")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(user_cmd())
        .subcommand(category_cmd())
        .subcommand(tx_cmd())
        .subcommand(budget_cmd())
        .subcommand(recurring_cmd())
        .subcommand(report_cmd())
        .subcommand(export_cmd())
}
