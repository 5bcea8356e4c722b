/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Tests for the Sequencer module.

pub mod ordering;
pub mod overflow;
