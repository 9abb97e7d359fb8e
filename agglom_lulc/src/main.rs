/*
This file is part of the Agglomeration LULC Extent Tool
Copyright (C) 2022 Novel-T

The Agglomeration LULC Extent Tool is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use anyhow::Result;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use structopt::StructOpt;

use crate::cmd_make_lulc::{make_agglom_lulc, MakeLulcArgs};

mod cmd_make_lulc;

#[derive(StructOpt)]
#[structopt(about = "Computes the LULC extent of the Lausanne agglomeration from the cadastre")]
struct Cli {
    #[structopt(long, default_value = "Info")]
    log_level: LevelFilter,

    #[structopt(flatten)]
    args: MakeLulcArgs,
}

fn run() -> Result<()> {
    let cli = Cli::from_args();

    SimpleLogger::new().with_level(cli.log_level).init()?;

    make_agglom_lulc(&cli.args)
}

fn main() {
    run().unwrap();
}
