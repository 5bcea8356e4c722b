/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

mod config_tests;
mod scenario_tests;
mod udp_tests;
