//! Shell entrypoints of the rendered containers. User input only ever reaches
//! them through environment variables or positional arguments.

pub const GIT_FETCH: &str = r#"set -eu
depth_args=""
if [ -n "${GIT_DEPTH:-}" ]; then
  depth_args="--depth ${GIT_DEPTH}"
fi
if [ -n "${GIT_REVISION:-}" ]; then
  git init -q /workspace/src
  cd /workspace/src
  git remote add origin "${GIT_URL}"
  git fetch $depth_args origin "${GIT_REVISION}"
  git checkout -q --detach FETCH_HEAD
else
  git clone $depth_args "${GIT_URL}" /workspace/src
fi
"#;

pub const S3_FETCH: &str = r#"set -eu
creds=/var/run/secrets/buildtask/s3
if [ -f "${creds}/AWS_ACCESS_KEY_ID" ]; then
  AWS_ACCESS_KEY_ID="$(cat "${creds}/AWS_ACCESS_KEY_ID")"
  export AWS_ACCESS_KEY_ID
fi
if [ -f "${creds}/AWS_SECRET_ACCESS_KEY" ]; then
  AWS_SECRET_ACCESS_KEY="$(cat "${creds}/AWS_SECRET_ACCESS_KEY")"
  export AWS_SECRET_ACCESS_KEY
fi
endpoint_args=""
if [ -n "${S3_ENDPOINT:-}" ]; then
  endpoint_args="--endpoint-url ${S3_ENDPOINT}"
fi
aws s3 cp $endpoint_args "s3://${S3_BUCKET}/${S3_KEY}" /workspace/context.tar
mkdir -p /workspace/src
tar -xf /workspace/context.tar -C /workspace/src
"#;

/// Build args arrive as positional `--build-arg K=V` pairs.
pub const BUILD: &str = r#"set -eu
if [ -n "${BUILDTASK_DOCKERFILE_INLINE:-}" ]; then
  printf '%s' "${BUILDTASK_DOCKERFILE_INLINE}" > /workspace/Dockerfile.inline
  dockerfile=/workspace/Dockerfile.inline
else
  dockerfile="${BUILDTASK_CONTEXT_DIR}/${BUILDTASK_DOCKERFILE}"
fi
buildah --storage-driver "${BUILDTASK_STORAGE_DRIVER}" bud \
  --tls-verify="${BUILDTASK_TLS_VERIFY}" --layers \
  -f "${dockerfile}" -t "${BUILDTASK_IMAGE}" "$@" "${BUILDTASK_CONTEXT_DIR}"
for tag in ${BUILDTASK_EXTRA_IMAGES:-}; do
  buildah --storage-driver "${BUILDTASK_STORAGE_DRIVER}" tag "${BUILDTASK_IMAGE}" "${tag}"
done
if [ "${BUILDTASK_PUSH}" = "true" ]; then
  buildah --storage-driver "${BUILDTASK_STORAGE_DRIVER}" push \
    --tls-verify="${BUILDTASK_TLS_VERIFY}" --digestfile /workspace/image-digest "${BUILDTASK_IMAGE}"
  for tag in ${BUILDTASK_EXTRA_IMAGES:-}; do
    buildah --storage-driver "${BUILDTASK_STORAGE_DRIVER}" push \
      --tls-verify="${BUILDTASK_TLS_VERIFY}" "${tag}"
  done
  cat /workspace/image-digest > /dev/termination-log
fi
"#;
