#![cfg(test)]

mod mock_runtime;

mod cacao_pool;
mod observation;
mod swapping;
mod trade_account;
