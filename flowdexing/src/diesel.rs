pub mod schema {
    diesel::table! {
      flowdexing_chain_states (chain_id) {
          chain_id -> Int8,
          last_processed_block -> Int8,
          is_synced -> Bool,
      }
    }

    diesel::table! {
      flowdexing_events (id) {
          id -> Uuid,
          event -> VarChar,
          chain_id -> Int8,
          block_number -> Int8,
          transaction_hash -> VarChar,
          ipfs_hash -> VarChar,
          job_id -> Nullable<VarChar>,
          nonce -> Nullable<VarChar>,
          timestamp -> Int8,
          receipt -> Nullable<Jsonb>,
          inserted_at -> Timestamptz,
      }
    }

    diesel::table! {
      flowdexing_workflows (ipfs_hash) {
          ipfs_hash -> VarChar,
          has_meta -> Bool,
          runs -> Int8,
          is_cancelled -> Bool,
          meta -> Nullable<Jsonb>,
          last_meta_fetch_failure -> Nullable<Int8>,
      }
    }

    diesel::table! {
      flowdexing_run_markers (id) {
          id -> Int4,
          ipfs_hash -> VarChar,
          nonce -> VarChar,
      }
    }
}
